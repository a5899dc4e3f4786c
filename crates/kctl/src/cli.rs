use clap::{Parser, Subcommand};
use foo::FooCommand;

use crate::{client_config::ConfigFlags, state::State};

mod foo;

#[derive(Parser)]
#[command(author, version, about, long_about = None, subcommand_required = true)]
struct Command {
    #[command(flatten)]
    config_flags: ConfigFlags,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Foo(FooCommand),
}

pub async fn execute() -> anyhow::Result<()> {
    let cli = Command::parse();
    let state = State::new(cli.config_flags.clone());

    match cli
        .command
        .as_ref()
        .expect("commands are required should've been caught by clap")
    {
        Commands::Foo(cmd) => cmd.execute(&state).await,
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;
    use crate::printer::OutputFormat;

    #[test]
    fn test_command_definition() {
        Command::command().debug_assert();
    }

    #[test]
    fn test_parse_foo() -> anyhow::Result<()> {
        let cli = Command::try_parse_from([
            "kctl", "-n", "team-a", "foo", "--count", "3", "-f", "a.yaml", "--filename", "b.yaml",
            "-o", "yaml",
        ])?;

        assert_eq!(Some("team-a".to_string()), cli.config_flags.namespace);

        let Some(Commands::Foo(foo)) = cli.command else {
            panic!("expected foo command");
        };
        assert_eq!(3, foo.count);
        assert_eq!(vec!["a.yaml", "b.yaml"], foo.filenames.filename);
        assert_eq!(OutputFormat::Yaml, foo.output);

        Ok(())
    }

    #[test]
    fn test_negative_count_reaches_validation() -> anyhow::Result<()> {
        let cli = Command::try_parse_from(["kctl", "foo", "-c", "-1", "-f", "a.yaml"])?;

        let Some(Commands::Foo(foo)) = cli.command else {
            panic!("expected foo command");
        };
        assert_eq!(-1, foo.count);

        Ok(())
    }

    #[test]
    fn test_parse_jsonpath_output() -> anyhow::Result<()> {
        let cli = Command::try_parse_from([
            "kctl",
            "foo",
            "-f",
            "a.yaml",
            "-o",
            "jsonpath={.metadata.name}",
            "--show-managed-fields",
        ])?;

        let Some(Commands::Foo(foo)) = cli.command else {
            panic!("expected foo command");
        };
        assert!(matches!(foo.output, OutputFormat::JsonPath(_)));
        assert!(foo.show_managed_fields);

        assert!(Command::try_parse_from(["kctl", "foo", "-f", "a.yaml", "-o", "table"]).is_err());

        Ok(())
    }

    #[test]
    fn test_filename_is_required() {
        assert!(Command::try_parse_from(["kctl", "foo", "--count", "1"]).is_err());
    }
}
