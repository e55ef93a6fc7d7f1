// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

use anyhow::Context;
use clap::Parser;
use davclient::record::{Attributes, ResourceRecord};
use davsync::{SyncAdapter, SyncOperation, SyncOutcome};
use log::info;

use crate::{cli::Command, profile::Profile};

mod cli;
mod profile;

fn print_attributes(attributes: &Attributes) {
    for (key, value) in attributes {
        println!("{key}: {value}");
    }
}

fn print_record(record: &ResourceRecord) {
    println!("href: {}", record.href);
    println!("id: {}", record.id);
    print_attributes(&record.properties);
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Record(attributes) => print_attributes(attributes),
        SyncOutcome::Resource(record) => print_record(record),
        SyncOutcome::Resources(records) => {
            if records.is_empty() {
                println!("No items in collection");
            }
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_record(record);
            }
        }
        SyncOutcome::Raw(raw) => {
            if !raw.is_empty() {
                println!("{}", String::from_utf8_lossy(raw));
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    simple_logger::init_with_level(cli.log_level()).context("failed to initialise logging")?;

    let profile = Profile::load(&cli.profile)?;
    let password = std::env::var("DAVCLI_PASSWORD").ok();
    let client = profile.build_client(password)?;
    let schema = profile.schema();
    let shape = cli.shape.merge(profile.shape());
    let kind = cli.command.kind();

    let operation = match cli.command {
        Command::Read { url, depth } => {
            let operation = SyncOperation::new(kind, url, &schema);
            match depth {
                Some(depth) => operation.with_depth(depth),
                None => operation,
            }
        }
        Command::Create { url, fields }
        | Command::Update { url, fields }
        | Command::Patch { url, fields } => SyncOperation::new(kind, url, &schema)
            .with_payload(fields.into_iter().collect()),
        Command::Delete { url } => SyncOperation::new(kind, url, &schema),
    }
    .with_shape(shape);

    info!("Sending {} request to {}.", operation.method(), operation.url);
    let outcome = SyncAdapter::new(client)
        .sync(operation)
        .await
        .context("operation failed")?;
    print_outcome(&outcome);

    Ok(())
}
