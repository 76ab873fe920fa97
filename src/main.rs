// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use annograph::app_config::{self, Config};
use annograph::backend::{Backend, ElementRecord};
use annograph::database::Repository;
use annograph::model::{Content, ElementKind, Group, Member, Package};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ElementKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliElementKind {
    Media,
    Annotation,
    Relation,
    List,
    Tag,
    View,
    Query,
    Resource,
    Import,
}

impl From<CliElementKind> for ElementKind {
    fn from(kind: CliElementKind) -> Self {
        match kind {
            CliElementKind::Media => ElementKind::Media,
            CliElementKind::Annotation => ElementKind::Annotation,
            CliElementKind::Relation => ElementKind::Relation,
            CliElementKind::List => ElementKind::List,
            CliElementKind::Tag => ElementKind::Tag,
            CliElementKind::View => ElementKind::View,
            CliElementKind::Query => ElementKind::Query,
            CliElementKind::Resource => ElementKind::Resource,
            CliElementKind::Import => ElementKind::Import,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty package
    Init {
        /// Package id
        package: String,
    },

    /// Add an element to a package
    Add {
        /// Package id
        package: String,

        /// Kind of the new element
        #[arg(value_enum)]
        kind: CliElementKind,

        /// Element id
        id: String,

        /// Content mimetype
        #[arg(short, long)]
        mimetype: Option<String>,

        /// Media location, or content url for other kinds
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Import another package under a local id
    Import {
        /// Importing package id
        package: String,

        /// Local id of the import
        import_id: String,

        /// Imported package id
        imported: String,
    },

    /// Append annotations to a relation
    Append {
        /// Package id
        package: String,

        /// Relation id
        relation: String,

        /// Id-refs of the annotations, in order
        #[arg(required = true)]
        idrefs: Vec<String>,
    },

    /// List the members of a relation
    Members {
        /// Package id
        package: String,

        /// Relation id
        relation: String,
    },

    /// List the elements of a package
    Elements {
        /// Package id
        package: String,

        /// Only list elements of this kind
        #[arg(short, long, value_enum)]
        kind: Option<CliElementKind>,
    },

    /// Show database statistics
    Stats,

    /// Generate shell completions for annograph
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// annograph - annotation graph packages
///
/// Manages annotation packages stored in a SQLite database: medias,
/// annotations and the relations linking them.
#[derive(Parser, Debug)]
#[command(name = "annograph")]
#[command(version = "0.1.0")]
#[command(about = "Annotation graph package tool")]
#[command(long_about = "annograph stores annotation packages in a SQLite database.

EXAMPLES:
    annograph init movie                                # Create a package
    annograph add movie media m1 --url file:///movie.mp4
    annograph add movie annotation a1 -m text/plain
    annograph add movie relation r1
    annograph append movie r1 a1 a2                     # Append members to a relation
    annograph import notes base movie                   # Import 'movie' into 'notes' as 'base'
    annograph append notes r base:a1 movie#a2           # Relative and absolute id-refs
    annograph members movie r1
    annograph completions bash > annograph.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file
    doesn't exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Database file, overriding the configuration
    #[arg(short, long, env = "ANNOGRAPH_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CliLogger {
    level: LevelFilter,
}

impl CliLogger {
    fn new(level: LevelFilter) -> Self {
        CliLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CliLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // The logger accepts everything; the effective level is the max level
    CliLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).into());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "annograph", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    } else {
        log::set_max_level(config.log_level.into());
    }
    if let Some(database) = &cli.database {
        config.database.path = Some(database.clone());
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    let database_path = config.database_path()?;
    let repository = Repository::open(&database_path, config.database.journal_mode)?;
    debug!("Using database {:?}", database_path);

    run_command(cli.command, repository)
}

fn run_command(command: Commands, repository: Repository) -> Result<()> {
    let backend: Rc<dyn Backend> = Rc::new(repository.clone());

    match command {
        Commands::Init { package } => {
            Package::create(backend, &package)?;
            info!("Package {} created", package);
        }
        Commands::Add {
            package,
            kind,
            id,
            mimetype,
            url,
        } => {
            let kind = ElementKind::from(kind);
            if kind == ElementKind::Import {
                return Err(anyhow!("Use the import command to add imports"));
            }
            let package = Package::open(backend, &package)?;
            let mut record = ElementRecord::new(&id, kind);
            if kind == ElementKind::Media {
                let url = url.ok_or_else(|| anyhow!("A media needs --url"))?;
                record = record.with_uri(url);
            } else if kind.has_content() {
                let mut content = mimetype.map(Content::new).unwrap_or_default();
                content.url = url;
                record = record.with_content(content);
            } else if mimetype.is_some() || url.is_some() {
                warn!("A {} has no content, ignoring --mimetype and --url", kind);
            }
            let element = package.create_element(record)?;
            info!("Added {}", element);
        }
        Commands::Import {
            package,
            import_id,
            imported,
        } => {
            let package = Package::open(backend.clone(), &package)?;
            let imported = Package::open(backend, &imported)?;
            package.add_import(&import_id, &imported)?;
            info!("{} now imports {} as {}", package.id(), imported.id(), import_id);
        }
        Commands::Append {
            package,
            relation,
            idrefs,
        } => {
            let package = Package::open(backend, &package)?;
            let mut relation = package.relation(&relation)?;
            for idref in &idrefs {
                let element = package.require_element(idref)?;
                relation.append(&element)?;
            }
            package.save()?;
            info!("Relation {} has {} member(s)", relation.id(), relation.len());
        }
        Commands::Members { package, relation } => {
            let package = Package::open(backend, &package)?;
            let mut relation = package.relation(&relation)?;
            let idrefs: Vec<String> = relation.iter_member_idrefs().collect::<Result<_, _>>()?;
            let members: Vec<Member> = relation.iter_members().collect::<Result<_, _>>()?;
            for (index, (idref, member)) in idrefs.iter().zip(members).enumerate() {
                match member {
                    Member::Element(element) => {
                        println!("{:>4}  {}  ({})", index, idref, element.absolute_idref())
                    }
                    Member::Dangling(_) => println!("{:>4}  {}  (dangling)", index, idref),
                }
            }
        }
        Commands::Elements { package, kind } => {
            let package = Package::open(backend, &package)?;
            let kinds: Vec<ElementKind> = match kind {
                Some(kind) => vec![kind.into()],
                None => ElementKind::ALL.to_vec(),
            };
            for kind in kinds {
                let view = package.of_kind(kind);
                if view.is_empty() {
                    continue;
                }
                println!("{} ({})", kind.plural(), view.count());
                for element in view {
                    println!("  {}", element.id());
                }
            }
        }
        Commands::Stats => {
            let stats = repository.connection().stats()?;
            println!("{}", stats);
            for record in repository.package_records()? {
                println!("  {}  (updated {})", record.id, record.updated_at);
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
