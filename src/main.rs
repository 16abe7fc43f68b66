use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mongo_bridge::config::ConfigLoader;
use mongo_bridge::{logging, register, Arguments, Binary, Document, ModuleRegistry, Value};

#[derive(Parser, Debug)]
#[command(name = "mongo-bridge", version, about = "MongoDB bridge for load-test scripts")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "MONGO_BRIDGE_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// UUID codec
    Uuid {
        #[command(subcommand)]
        action: UuidAction,
    },
    /// ISO date codec
    Date {
        #[command(subcommand)]
        action: DateAction,
    },
    /// Insert, read back and drop a document against a live server
    Smoke {
        /// Connection string
        #[arg(long, env = "MONGODB_URI")]
        uri: String,

        #[arg(long, default_value = "mongo_bridge")]
        database: String,

        #[arg(long, default_value = "smoke")]
        collection: String,

        /// Extra fields as a JSON object; extended JSON (`$date`, `$oid`) is honored
        #[arg(long)]
        doc: Option<String>,

        /// Leave the collection in place
        #[arg(long)]
        keep: bool,
    },
}

#[derive(Subcommand, Debug)]
enum UuidAction {
    /// Generate a random UUID
    Generate,
    /// Parse a dashed or undashed UUID string and print its bytes
    Parse { value: String },
    /// Format 16 hex-encoded bytes as a UUID string
    Format {
        bytes: String,
        #[arg(long, default_value = "4")]
        subtype: u8,
    },
}

#[derive(Subcommand, Debug)]
enum DateAction {
    /// Print the current instant
    Now,
    /// Parse an RFC3339 timestamp
    Parse { value: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigLoader::new()
        .load_from_file(args.config.as_deref())
        .load_from_env()
        .build()?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    logging::init(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    let mut registry = ModuleRegistry::new();
    register(&mut registry, &config)?;
    let module = registry
        .get(&config.module.name)
        .context("module was not registered")?;

    match args.command {
        Command::Uuid { action } => match action {
            UuidAction::Generate => {
                let id = module.invoke("generateUuid", Arguments::default())?;
                let text = module.invoke("convertUuidToString", args_of(id.into_value()))?;
                print_value(text.into_value());
            }
            UuidAction::Parse { value } => {
                let id = module.invoke("convertStringToUuid", args_of(Some(value.into())))?;
                print_value(id.into_value());
            }
            UuidAction::Format { bytes, subtype } => {
                let binary = Binary::new(subtype, decode_hex(&bytes)?);
                let text = module.invoke("convertUuidToString", args_of(Some(binary.into())))?;
                print_value(text.into_value());
            }
        },
        Command::Date { action } => match action {
            DateAction::Now => {
                print_value(module.invoke("generateIsoDate", Arguments::default())?.into_value());
            }
            DateAction::Parse { value } => {
                let date = module.invoke("convertStringToIsoDate", args_of(Some(value.into())))?;
                print_value(date.into_value());
            }
        },
        Command::Smoke {
            uri,
            database,
            collection,
            doc,
            keep,
        } => {
            let extra = match doc {
                Some(text) => {
                    let json: serde_json::Value =
                        serde_json::from_str(&text).context("--doc is not valid JSON")?;
                    Document::from_json(json)?
                }
                None => Document::new(),
            };

            let client = module
                .invoke("newClient", args_of(Some(uri.into())))?
                .into_object()
                .context("could not connect, see log for details")?;

            let id = module
                .invoke("generateUuid", Arguments::default())?
                .into_value()
                .unwrap_or_default();
            let now = module
                .invoke("generateIsoDate", Arguments::default())?
                .into_value()
                .unwrap_or_default();
            let mut doc = Document::new()
                .with_field("correlationId", id)
                .with_field("title", "smoke")
                .with_field("createdAt", now);
            for (key, value) in extra {
                doc.insert(key, value);
            }

            let route = || vec![Value::from(database.as_str()), Value::from(collection.as_str())];

            let mut insert = route();
            insert.push(doc.into());
            client.invoke("insert", insert.into())?;

            let docs = client.invoke("findAll", route().into())?;
            print_value(docs.into_value());

            let count = client.invoke("countDocuments", route().into())?;
            print_value(count.into_value());

            if !keep {
                client.invoke("dropCollection", route().into())?;
            }
            client.invoke("disconnect", Arguments::default())?;
        }
    }

    Ok(())
}

fn args_of(value: Option<Value>) -> Arguments {
    Arguments::new(value.into_iter().collect())
}

fn print_value(value: Option<Value>) {
    let json = value.unwrap_or_default().to_json();
    println!("{}", serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string()));
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    if input.len() % 2 != 0 || !input.is_ascii() {
        bail!("hex input must have an even number of digits");
    }
    (0..input.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&input[i..i + 2], 16)
                .with_context(|| format!("invalid hex digits at {}", i))
        })
        .collect()
}
