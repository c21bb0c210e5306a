use clap::Parser;
use rusty_mysql_kit::config::{ProbeCommand, ProbeConfig};
use rusty_mysql_kit::{MysqlExecutor, StatementBuilder};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProbeConfig::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let executor = MysqlExecutor::from_url(&config.url)?;
    let builder = StatementBuilder::new(executor);
    let schema = builder.schema();

    match &config.command {
        ProbeCommand::Databases => {
            let names = schema.list_databases().await?;
            info!("{} databases", names.len());
            for name in names {
                println!("{name}");
            }
        }
        ProbeCommand::Tables { database } => {
            for table in schema.list_tables(database).await? {
                println!("{}\t{}", table.table_name, table.column_count);
            }
        }
        ProbeCommand::Columns { database, table } => {
            for column in schema.list_columns(database, table).await? {
                let definition = column
                    .column_type()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|_| column.data_type.to_uppercase());
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    column.column_name,
                    definition,
                    column.is_nullable,
                    column.default_text,
                    column.character_set_name.as_deref().unwrap_or("-"),
                );
            }
        }
        ProbeCommand::ShowCreate { table } => {
            println!("{}", builder.show_create_table(table).await?);
        }
    }
    Ok(())
}
