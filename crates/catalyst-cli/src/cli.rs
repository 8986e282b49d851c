use std::path::PathBuf;

use catalyst_history::HistoryType;
use catalyst_types::{ContentHash, EntityType, Pointer};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalyst", version, about = "Deploy and query signed content entities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Service configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root. Overrides `storage.root` from the configuration.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a signing key and print its address.
    Keygen,
    /// Print the content hash of each file.
    Hash(HashArgs),
    /// Sign and deploy the files of a directory as one entity.
    Deploy(DeployArgs),
    /// Look up live entities by pointer or id.
    Entities(EntitiesArgs),
    /// List occupied pointers of a type.
    Pointers(PointersArgs),
    /// Show who deployed an entity, and when.
    Audit(AuditArgs),
    /// List history events.
    History(HistoryArgs),
    /// Record the current pointer state in the history.
    Snapshot,
    /// Report which content hashes are stored.
    Available(AvailableArgs),
    /// Print or save stored content.
    Content(ContentArgs),
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Directory whose files become the entity's content.
    pub dir: PathBuf,
    /// Hex-encoded secret key.
    #[arg(long)]
    pub key: String,
    #[arg(long = "type")]
    pub entity_type: EntityType,
    #[arg(long = "pointer", required = true)]
    pub pointers: Vec<Pointer>,
    /// Metadata as a JSON document.
    #[arg(long)]
    pub metadata: Option<String>,
    /// Entity timestamp in milliseconds. Defaults to now.
    #[arg(long)]
    pub timestamp: Option<u64>,
}

#[derive(Args)]
pub struct EntitiesArgs {
    #[arg(long = "type")]
    pub entity_type: EntityType,
    #[arg(long = "pointer")]
    pub pointers: Vec<Pointer>,
    #[arg(long = "id", conflicts_with = "pointers")]
    pub ids: Vec<ContentHash>,
}

#[derive(Args)]
pub struct PointersArgs {
    #[arg(long = "type")]
    pub entity_type: EntityType,
}

#[derive(Args)]
pub struct AuditArgs {
    #[arg(long = "type")]
    pub entity_type: EntityType,
    pub id: ContentHash,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Earliest timestamp, inclusive.
    #[arg(long)]
    pub from: Option<u64>,
    /// Latest timestamp, inclusive.
    #[arg(long)]
    pub to: Option<u64>,
    #[arg(long)]
    pub kind: Option<HistoryType>,
}

#[derive(Args)]
pub struct AvailableArgs {
    #[arg(required = true)]
    pub hashes: Vec<ContentHash>,
}

#[derive(Args)]
pub struct ContentArgs {
    pub hash: ContentHash,
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const HASH: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_keygen() {
        let cli = Cli::try_parse_from(["catalyst", "keygen"]).unwrap();
        assert!(matches!(cli.command, Command::Keygen));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_deploy() {
        let cli = Cli::try_parse_from([
            "catalyst", "deploy", "./scene", "--key", "ab", "--type", "scene",
            "--pointer", "0,0", "--pointer", " 0,1 ", "--root", "/tmp/data",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/data")));
        if let Command::Deploy(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("./scene"));
            assert_eq!(args.entity_type, EntityType::Scene);
            assert_eq!(
                args.pointers,
                vec![Pointer::new("0,0").unwrap(), Pointer::new("0,1").unwrap()]
            );
            assert!(args.timestamp.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn deploy_requires_a_pointer() {
        let result = Cli::try_parse_from([
            "catalyst", "deploy", "./scene", "--key", "ab", "--type", "scene",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_unknown_type_fails() {
        let result = Cli::try_parse_from(["catalyst", "pointers", "--type", "castle"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_entities_by_id() {
        let cli = Cli::try_parse_from([
            "catalyst", "entities", "--type", "profile", "--id", HASH, "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        if let Command::Entities(args) = cli.command {
            assert_eq!(args.entity_type, EntityType::Profile);
            assert!(args.pointers.is_empty());
            assert_eq!(args.ids, vec![ContentHash::from_hash([1; 32])]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn pointers_and_ids_conflict() {
        let result = Cli::try_parse_from([
            "catalyst", "entities", "--type", "scene", "--pointer", "0,0", "--id", HASH,
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_history_filters() {
        let cli = Cli::try_parse_from([
            "catalyst", "history", "--from", "10", "--to", "20", "--kind", "snapshot",
        ])
        .unwrap();
        if let Command::History(args) = cli.command {
            assert_eq!(args.from, Some(10));
            assert_eq!(args.to, Some(20));
            assert_eq!(args.kind, Some(HistoryType::Snapshot));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_content_output() {
        let cli = Cli::try_parse_from(["catalyst", "content", HASH, "-o", "out.bin"]).unwrap();
        if let Command::Content(args) = cli.command {
            assert_eq!(args.output, Some(PathBuf::from("out.bin")));
        } else {
            panic!("wrong command");
        }
    }
}
