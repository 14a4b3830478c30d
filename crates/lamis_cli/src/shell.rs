//! Line-oriented command shell over one tracker session.
//!
//! Commands mirror the app's action surface: toggle a cell, save one row,
//! save all rows, export to a file (or stdout), import from a file after an
//! explicit confirmation.

use chrono::Utc;
use lamis_core::{
    Column, FileChannel, GridRepository, ImportOutcome, MemoryChannel, RowKey, TrackerError,
    TrackerService,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const HELP: &str = "\
commands:
  show                 print the grid (* marks unsaved rows)
  toggle <row> <col>   flip one checkbox, e.g. `toggle 5 L`
  save <row>           save the grid and mark <row> as saved
  save-all             save the grid and mark every row as saved
  export [path]        write an export file (stdout when no path)
  import <path>        replace the grid with an export file (asks first)
  help                 show this text
  quit                 leave (unsaved rows are discarded)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show,
    Toggle { row: RowKey, column: Column },
    Save { row: RowKey },
    SaveAll,
    Export { path: Option<PathBuf> },
    Import { path: PathBuf },
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args = words.collect::<Vec<_>>();

    let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("show" | "ls", []) => Command::Show,
        ("toggle" | "t", [row, column]) => Command::Toggle {
            row: parse_row(row)?,
            column: column.parse::<Column>().map_err(|err| err.to_string())?,
        },
        ("save", [row]) => Command::Save {
            row: parse_row(row)?,
        },
        ("save-all" | "saveall", []) => Command::SaveAll,
        ("export", []) => Command::Export { path: None },
        ("export", [path]) => Command::Export {
            path: Some(PathBuf::from(path)),
        },
        ("import", [path]) => Command::Import {
            path: PathBuf::from(path),
        },
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        (other, _) => return Err(format!("unrecognized command `{other}`; try `help`")),
    };
    Ok(Some(command))
}

fn parse_row(raw: &str) -> Result<RowKey, String> {
    let value = raw
        .parse::<i64>()
        .map_err(|_| format!("row must be a number, got `{raw}`"))?;
    RowKey::new(value).map_err(|err| err.to_string())
}

/// Runs the shell until `quit` or end of input.
pub fn run<R, I, O>(
    service: &mut TrackerService<R>,
    input: &mut I,
    output: &mut O,
) -> io::Result<()>
where
    R: GridRepository,
    I: BufRead,
    O: Write,
{
    writeln!(output, "LAMIS tracker. Type `help` for commands.")?;
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = read_line(input)? else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(service, command, input, output)?,
            Ok(None) => {}
            Err(message) => writeln!(output, "error: {message}")?,
        }
    }

    if service.dirty_count() > 0 {
        writeln!(
            output,
            "warning: {} unsaved row(s) discarded",
            service.dirty_count()
        )?;
    }
    Ok(())
}

fn execute<R, I, O>(
    service: &mut TrackerService<R>,
    command: Command,
    input: &mut I,
    output: &mut O,
) -> io::Result<()>
where
    R: GridRepository,
    I: BufRead,
    O: Write,
{
    match command {
        Command::Show => print_grid(service, output),
        Command::Toggle { row, column } => {
            let flags = service.toggle(row, column);
            writeln!(
                output,
                "row {row} {column} = {} (unsaved)",
                on_off(flags.get(column))
            )
        }
        Command::Save { row } => match service.save_row(row) {
            Ok(()) => writeln!(output, "row {row} saved"),
            Err(err) => report(output, &err),
        },
        Command::SaveAll => match service.save_all() {
            Ok(()) => writeln!(output, "all rows saved"),
            Err(err) => report(output, &err),
        },
        Command::Export { path: Some(path) } => {
            match service.export(&mut FileChannel::new(&path), Utc::now()) {
                Ok(receipt) => writeln!(
                    output,
                    "exported {} row(s) to {} ({})",
                    receipt.exported_rows,
                    path.display(),
                    receipt.filename
                ),
                Err(err) => report(output, &err),
            }
        }
        Command::Export { path: None } => {
            let mut channel = MemoryChannel::new();
            match service.export(&mut channel, Utc::now()) {
                Ok(_) => writeln!(output, "{}", channel.content().unwrap_or_default()),
                Err(err) => report(output, &err),
            }
        }
        Command::Import { path } => import(service, path, input, output),
        Command::Help => writeln!(output, "{HELP}"),
        Command::Quit => Ok(()),
    }
}

fn import<R, I, O>(
    service: &mut TrackerService<R>,
    path: PathBuf,
    input: &mut I,
    output: &mut O,
) -> io::Result<()>
where
    R: GridRepository,
    I: BufRead,
    O: Write,
{
    let pending = match service.begin_import(&mut FileChannel::new(&path)) {
        Ok(pending) => pending,
        Err(TrackerError::TransferChannelEmpty) => {
            let reason = if path.exists() {
                "is empty"
            } else {
                "does not exist"
            };
            return writeln!(output, "error: import file `{}` {reason}", path.display());
        }
        Err(err) => return report(output, &err),
    };

    write!(
        output,
        "replace ALL data with `{}` ({} row(s))? this cannot be undone [y/N] ",
        pending.filename(),
        pending.row_count()
    )?;
    output.flush()?;
    let answer = read_line(input)?.unwrap_or_default();
    if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        pending.cancel();
        return writeln!(output, "import cancelled");
    }

    match service.apply_import(pending) {
        ImportOutcome::Applied { rows } => writeln!(output, "imported {rows} row(s)"),
        ImportOutcome::AppliedNotPersisted { rows, error } => writeln!(
            output,
            "imported {rows} row(s) but saving failed: {error}; retry with `save-all`"
        ),
    }
}

fn print_grid<R: GridRepository, O: Write>(
    service: &TrackerService<R>,
    output: &mut O,
) -> io::Result<()> {
    let header = Column::ALL
        .iter()
        .map(|column| column.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(output, " row  {header}")?;
    for row in RowKey::all() {
        let flags = service.flags(row);
        let cells = Column::ALL
            .iter()
            .map(|column| if flags.get(*column) { "x" } else { "." })
            .collect::<Vec<_>>()
            .join(" ");
        let marker = if service.is_dirty(row) { " *" } else { "" };
        writeln!(output, "{:>4}  {cells}{marker}", row.get())?;
    }
    writeln!(output, "unsaved rows: {}", service.dirty_count())
}

fn report<O: Write>(output: &mut O, err: &TrackerError) -> io::Result<()> {
    let hint = match err {
        TrackerError::Validation(_) | TrackerError::TransferChannelEmpty => {
            "; re-export the data and try again"
        }
        TrackerError::PersistenceFailure(_) => "; changes are kept in memory, retry the save",
        _ => "",
    };
    writeln!(output, "error: {err}{hint}")
}

fn read_line<I: BufRead>(input: &mut I) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_command, run, Command};
    use lamis_core::db::open_db_in_memory;
    use lamis_core::{Column, RowKey, SqliteGridRepository, TrackerService};
    use std::io::Cursor;

    fn memory_service() -> TrackerService<SqliteGridRepository> {
        TrackerService::open(SqliteGridRepository::new(open_db_in_memory().unwrap())).unwrap()
    }

    fn run_script(service: &mut TrackerService<SqliteGridRepository>, script: &str) -> String {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        run(service, &mut input, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn parses_toggle_and_rejects_bad_rows() {
        assert_eq!(
            parse_command("toggle 5 l").unwrap(),
            Some(Command::Toggle {
                row: RowKey::new(5).unwrap(),
                column: Column::L,
            })
        );
        assert!(parse_command("toggle 61 L").unwrap_err().contains("outside"));
        assert!(parse_command("toggle five L").unwrap_err().contains("number"));
        assert!(parse_command("fly").is_err());
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn toggle_and_save_flow() {
        let mut service = memory_service();
        let output = run_script(&mut service, "toggle 5 L\ntoggle 6 A\nsave 5\nquit\n");

        assert!(output.contains("row 5 L = on"));
        assert!(output.contains("row 5 saved"));
        assert!(output.contains("1 unsaved row(s) discarded"));
        assert!(!service.is_dirty(RowKey::new(5).unwrap()));
        assert!(service.is_dirty(RowKey::new(6).unwrap()));
    }

    #[test]
    fn show_marks_unsaved_rows() {
        let mut service = memory_service();
        let output = run_script(&mut service, "t 2 S\nshow\n");
        assert!(output.contains("   2  . . . . x *"));
        assert!(output.contains("   3  . . . . ."));
        assert!(output.contains("unsaved rows: 1"));
    }

    #[test]
    fn import_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let path_text = path.display().to_string();

        let mut source = memory_service();
        run_script(&mut source, &format!("toggle 9 M\nexport {path_text}\n"));

        let mut target = memory_service();
        target.toggle(RowKey::new(1).unwrap(), Column::L);
        let output = run_script(&mut target, &format!("import {path_text}\nn\n"));
        assert!(output.contains("import cancelled"));
        assert!(target.flags(RowKey::new(1).unwrap()).l);

        let output = run_script(&mut target, &format!("import {path_text}\ny\n"));
        assert!(output.contains("imported 1 row(s)"));
        assert!(!target.flags(RowKey::new(1).unwrap()).l);
        assert!(target.flags(RowKey::new(9).unwrap()).m);
        assert_eq!(target.dirty_count(), 0);
    }

    #[test]
    fn import_names_a_missing_or_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo.json");
        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "  \n").unwrap();

        let mut service = memory_service();
        let output = run_script(&mut service, &format!("import {}\n", missing.display()));
        assert!(output.contains(&format!(
            "import file `{}` does not exist",
            missing.display()
        )));
        assert!(!output.contains("nothing available"));

        let output = run_script(&mut service, &format!("import {}\n", empty.display()));
        assert!(output.contains(&format!("import file `{}` is empty", empty.display())));
        assert!(service.state().is_empty());
    }

    #[test]
    fn import_of_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let mut service = memory_service();
        let output = run_script(&mut service, &format!("import {}\n", path.display()));
        assert!(output.contains("import rejected"));
        assert!(service.state().is_empty());
    }
}
