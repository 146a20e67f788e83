use std::fs;
use tracing::info;
use crate::db::prelude::*;
use mongodb::error::{ErrorKind, WriteFailure};
use crate::utils::config::Configuration;
use crate::utils::errors::{ErrorCode, TurnstileError};
use mongodb::{Client, Database, bson::{Document, doc}, options::ClientOptions};

///
/// Run any schema-like updates against MongoDB that haven't been run yet.
///
pub async fn update_mongo(db: &Database) -> Result<(), TurnstileError> {
    create_init_indexes(db).await?;
    Ok(())
}

async fn create_init_indexes(db: &Database) -> Result<(), TurnstileError> {
    // The driver doesn't support creating indexes on collections, so the dbcommand must be used instead.
    // https://docs.mongodb.com/manual/reference/command/createIndexes/#createindexes
    for collection in [USERS, ADMINS].iter().copied() {
        db.run_command(doc! { "createIndexes": collection, "indexes": [
            { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id", "unique": true },
            { "key": { EMAIL: 1 }, "name": "idx_email", "unique": true },
            { "key": { EMAIL: 1, PHONE: 1 }, "name": "idx_email_phone", "unique": false }] }, None).await?;
    }

    Ok(())
}

///
/// Indicates if the MongoDB error is from a duplicate key violation.
///
pub fn is_duplicate_err(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000, /* Duplicate insert */
        _ => false,
    }
}


pub async fn get_mongo_db(app_name: &str, config: &Configuration) -> Result<Database, TurnstileError> {

    // Read username and password from a secrets file.
    let username = fs::read_to_string("secrets/mongodb_username")
        .map_err(|err| ErrorCode::UnableToReadCredentials
            .with_msg(&format!("Unable to read credentials from secrets/mongodb_username: {}", err)))?;

    let password = fs::read_to_string("secrets/mongodb_password")
        .map_err(|err| ErrorCode::UnableToReadCredentials
            .with_msg(&format!("Unable to read credentials from secrets/mongodb_password: {}", err)))?;

    let uri = config.mongo_uri.replace("$USERNAME", username.trim()).replace("$PASSWORD", password.trim());

    let mut client_options = ClientOptions::parse(&uri).await?;
    client_options.app_name = Some(app_name.to_string());

    // Get a handle to the deployment.
    let client = Client::with_options(client_options)?;

    info!("Connecting to MongoDB...");

    let db = client.database(&config.db_name);
    ping(&db).await?;

    info!("Connected to MongoDB");
    Ok(db)
}


pub async fn ping(db: &Database) -> Result<Document, TurnstileError> {
    Ok(db.run_command(doc! { "ping": 1 }, None).await?)
}
