use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use lorpaper::{
    Error, Result,
    report::{Mode, ReportEditor},
    settings::SettingsStore,
    templates::{Side, TemplateFile, TemplateStore},
};

#[derive(Parser)]
#[command(name = "lorpaper", version, about = "Render ENT report templates to documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one side of a template file to a document.
    Render {
        template: PathBuf,
        /// right, left, bilateral, convalescence or other
        #[arg(long, default_value = "right")]
        side: String,
        #[arg(long)]
        operation: bool,
        /// One table per section instead of a single report table.
        #[arg(long)]
        split: bool,
        /// Output path; the extension picks the format.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        doctor: Option<String>,
    },
    /// List stored templates.
    List {
        #[arg(long)]
        operation: bool,
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn mode(operation: bool) -> Mode {
    if operation {
        Mode::Operation
    } else {
        Mode::Examination
    }
}

fn render(
    template: PathBuf,
    side: &str,
    operation: bool,
    split: bool,
    output: PathBuf,
    doctor: Option<String>,
) -> Result<()> {
    let side = Side::from_key(side)
        .ok_or_else(|| Error::Template(format!("unknown side '{side}'")))?;
    let file: TemplateFile = serde_json::from_str(&fs::read_to_string(&template)?)?;
    let data = file.side(side).ok_or_else(|| {
        Error::Template(format!(
            "'{}' has no data for side '{}'",
            template.display(),
            side.key()
        ))
    })?;

    let store = SettingsStore::load();
    let mut editor = ReportEditor::with_settings(store.settings());
    editor.set_operation_mode(operation);
    editor.set_split_layout(split);
    if let Some(doctor) = doctor {
        let specialty = editor.signature().specialty.clone();
        editor.set_signature(&specialty, &doctor);
    }
    editor.apply_template(data);
    editor.export(&output)?;
    println!("{} ({} page(s))", output.display(), editor.pages());
    Ok(())
}

fn list(operation: bool, root: Option<PathBuf>) -> Result<()> {
    let templates = match root {
        Some(root) => TemplateStore::new(root),
        None => {
            let store = SettingsStore::load();
            TemplateStore::from_settings(store.settings().templates.root.as_deref())
        }
    };
    for name in templates.list(mode(operation)) {
        println!("{name}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Render {
            template,
            side,
            operation,
            split,
            output,
            doctor,
        } => render(template, &side, operation, split, output, doctor),
        Command::List { operation, root } => list(operation, root),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lorpaper: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_parses_split_and_side() {
        let cli = Cli::try_parse_from([
            "lorpaper", "render", "t.json", "--side", "left", "--split", "-o", "out.pdf",
        ])
        .unwrap();
        let Command::Render { side, split, operation, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(side, "left");
        assert!(split);
        assert!(!operation);

        let command = Cli::command();
        let render = command.find_subcommand("render").unwrap();
        let help = render
            .get_arguments()
            .find(|arg| arg.get_id() == "split")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("One table per section"));
    }
}
