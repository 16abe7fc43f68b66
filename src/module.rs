//! Module facade
//!
//! [`Mongo`] is what scripts import. It exposes the codecs and the client
//! factory and keeps no mutable state; the clients it hands out carry their
//! own session.

use crate::client::{Client, UpsertModel};
use crate::codec;
use crate::config::{BridgeConfig, ClientConfig};
use crate::document::{Binary, Document, Value};
use crate::error::{Result, ScriptError};
use crate::host::{unknown_method, Arguments, Exported, HostObject, ModuleRegistry};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

const MODULE_METHODS: &[&str] = &[
    "generateUuid",
    "convertStringToUuid",
    "convertUuidToString",
    "generateIsoDate",
    "convertStringToIsoDate",
    "newClient",
];

const CLIENT_METHODS: &[&str] = &[
    "insert",
    "insertMany",
    "upsert",
    "find",
    "findAll",
    "findOne",
    "aggregate",
    "updateOne",
    "updateMany",
    "deleteOne",
    "deleteMany",
    "distinct",
    "countDocuments",
    "dropCollection",
    "findOneAndUpdate",
    "disconnect",
];

/// Register the module with the host under the configured name
pub fn register(registry: &mut ModuleRegistry, config: &BridgeConfig) -> Result<()> {
    config.validate()?;
    registry.register(
        &config.module.name,
        Arc::new(Mongo::new(config.client.clone())),
    )
}

/// Module entry point
#[derive(Debug, Clone, Default)]
pub struct Mongo {
    client_config: ClientConfig,
}

impl Mongo {
    pub fn new(client_config: ClientConfig) -> Self {
        Self { client_config }
    }

    pub fn generate_uuid(&self) -> Result<Binary> {
        codec::generate_uuid()
    }

    pub fn convert_string_to_uuid(&self, input: &str) -> Result<Binary> {
        codec::convert_string_to_uuid(input)
    }

    pub fn convert_uuid_to_string(&self, binary: &Binary) -> Result<String> {
        codec::convert_uuid_to_string(binary)
    }

    pub fn generate_iso_date(&self) -> DateTime<Utc> {
        codec::generate_iso_date()
    }

    pub fn convert_string_to_iso_date(&self, input: &str) -> Result<DateTime<Utc>> {
        codec::convert_string_to_iso_date(input)
    }

    /// Connect to `uri`. Failures are logged and reported as `None`; use
    /// [`Client::connect`] for the error itself.
    pub fn new_client(&self, uri: &str) -> Option<Client> {
        info!("start creating new client");
        match Client::connect(uri, &self.client_config) {
            Ok(client) => Some(client),
            Err(err) => {
                error!(error = %err, "Error while establishing a connection to MongoDB");
                None
            }
        }
    }
}

impl HostObject for Mongo {
    fn methods(&self) -> &'static [&'static str] {
        MODULE_METHODS
    }

    fn invoke(&self, method: &str, args: Arguments) -> std::result::Result<Exported, ScriptError> {
        let out: Exported = match method {
            "generateUuid" => Value::from(self.generate_uuid()?).into(),
            "convertStringToUuid" => {
                Value::from(self.convert_string_to_uuid(args.string(0)?)?).into()
            }
            "convertUuidToString" => {
                Value::from(self.convert_uuid_to_string(args.binary(0)?)?).into()
            }
            "generateIsoDate" => Value::from(self.generate_iso_date()).into(),
            "convertStringToIsoDate" => {
                Value::from(self.convert_string_to_iso_date(args.string(0)?)?).into()
            }
            "newClient" => match self.new_client(args.string(0)?) {
                Some(client) => Exported::Object(Arc::new(client)),
                None => Exported::null(),
            },
            other => return Err(unknown_method("Mongo", other)),
        };
        Ok(out)
    }
}

fn documents_value(docs: Vec<Document>) -> Exported {
    Value::Array(docs.into_iter().map(Value::Document).collect()).into()
}

impl HostObject for Client {
    fn methods(&self) -> &'static [&'static str] {
        CLIENT_METHODS
    }

    fn invoke(&self, method: &str, args: Arguments) -> std::result::Result<Exported, ScriptError> {
        if method == "disconnect" {
            self.disconnect()?;
            return Ok(Exported::null());
        }
        if !CLIENT_METHODS.contains(&method) {
            return Err(unknown_method("Client", method));
        }

        let database = args.string(0)?;
        let collection = args.string(1)?;

        let out: Exported = match method {
            "insert" => {
                self.insert(database, collection, args.document(2)?)?;
                Exported::null()
            }
            "insertMany" => {
                self.insert_many(database, collection, args.documents(2)?)?;
                Exported::null()
            }
            "upsert" => {
                // upsert(db, coll, {query, update}) or upsert(db, coll, filter, update)
                let model = if args.len() == 3 {
                    UpsertModel::from_document(args.document(2)?)?
                } else {
                    UpsertModel::new(args.document(2)?, args.document(3)?)
                };
                self.upsert_model(database, collection, model)?;
                Exported::null()
            }
            "find" => documents_value(self.find(
                database,
                collection,
                args.document_or_empty(2)?,
                args.document_or_empty(3)?,
                args.integer_or(4, 0)?,
            )?),
            "findAll" => documents_value(self.find_all(database, collection)?),
            "findOne" => {
                Value::from(self.find_one(database, collection, args.document_or_empty(2)?)?)
                    .into()
            }
            "aggregate" => {
                documents_value(self.aggregate(database, collection, args.documents(2)?)?)
            }
            "updateOne" => {
                self.update_one(database, collection, args.document(2)?, args.document(3)?)?;
                Exported::null()
            }
            "updateMany" => {
                self.update_many(database, collection, args.document(2)?, args.document(3)?)?;
                Exported::null()
            }
            "deleteOne" => {
                self.delete_one(database, collection, args.document(2)?)?;
                Exported::null()
            }
            "deleteMany" => {
                self.delete_many(database, collection, args.document(2)?)?;
                Exported::null()
            }
            "distinct" => Value::Array(self.distinct(
                database,
                collection,
                args.string(2)?,
                args.document_or_empty(3)?,
            )?)
            .into(),
            "countDocuments" => Value::Int(self.count_documents(
                database,
                collection,
                args.document_or_empty(2)?,
            )?)
            .into(),
            "dropCollection" => {
                self.drop_collection(database, collection)?;
                Exported::null()
            }
            "findOneAndUpdate" => Value::from(self.find_one_and_update(
                database,
                collection,
                args.document(2)?,
                args.document(3)?,
            )?)
            .into(),
            other => return Err(unknown_method("Client", other)),
        };
        Ok(out)
    }
}
