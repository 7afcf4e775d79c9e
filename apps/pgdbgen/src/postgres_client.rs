use async_trait::async_trait;
use log::{debug, error, info};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::{Client, Config as PostgresConfig, NoTls, Statement};

use crate::config::DatabaseConfig;
use crate::derive::{Account, Payment, Product, PurchaseStat};
use crate::error::{GeneratorError, Result};
use crate::sink::{RecordStore, RecordWriter};

const MAINTENANCE_DB: &str = "postgres";

const INSERT_PAYMENT: &str = "INSERT INTO payments (p_md5, p_amount, p_epoch) VALUES ($1, $2, $3)";
const INSERT_BUYING_STATS: &str = "INSERT INTO buying_stats (bstats_user_id, bstats_epoch, bstats_product_id, bstats_quantity, bstats_total_amount) VALUES ($1, $2, $3, $4, $5)";
const INSERT_PRODUCT: &str = "INSERT INTO products (prd_id, prd_name, prd_authors, prd_price) VALUES ($1, $2, $3, $4)";
const INSERT_ACCOUNT: &str = "INSERT INTO accounts (acc_user_epoch, acc_user_id, acc_user_name, acc_user_password, acc_user_email, acc_user_last_login) VALUES ($1, $2, $3, $4, $5, $6)";

pub const CREATE_TABLES: [(&str, &str); 4] = [
    (
        "payments",
        "CREATE TABLE IF NOT EXISTS payments (
            p_id SERIAL PRIMARY KEY,
            p_md5 VARCHAR(255),
            p_amount NUMERIC(10, 2),
            p_epoch BIGINT
        )",
    ),
    (
        "buying_stats",
        "CREATE TABLE IF NOT EXISTS buying_stats (
            bstats_id SERIAL PRIMARY KEY,
            bstats_epoch BIGINT,
            bstats_user_id uuid,
            bstats_product_id uuid,
            bstats_quantity INT,
            bstats_total_amount NUMERIC(10, 2)
        )",
    ),
    (
        "products",
        "CREATE TABLE IF NOT EXISTS products (
            prd_id uuid PRIMARY KEY,
            prd_name VARCHAR(100),
            prd_authors VARCHAR(100),
            prd_price NUMERIC(10, 2)
        )",
    ),
    (
        "accounts",
        "CREATE TABLE IF NOT EXISTS accounts (
            bstats_id SERIAL PRIMARY KEY,
            acc_user_epoch BIGINT,
            acc_user_id uuid,
            acc_user_name VARCHAR(100) NOT NULL,
            acc_user_password VARCHAR(255) NOT NULL,
            acc_user_email VARCHAR(255) NOT NULL,
            acc_user_last_login BIGINT
        )",
    ),
];

/// Open a connection and drive it on its own task until the client is dropped.
pub async fn connect(config: &PostgresConfig) -> Result<Client> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {}", e);
        }
    });
    Ok(client)
}

/// Double-quote an identifier for use in DDL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the target database through the maintenance database if it is missing.
///
/// Returns `true` when the database was created by this call.
pub async fn create_database_if_not_exists(database: &DatabaseConfig) -> Result<bool> {
    let client = connect(&database.postgres_config_for(MAINTENANCE_DB)).await?;
    info!("Connected to database engine at {}:{}", database.host, database.port);

    let existing = client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&database.dbname])
        .await?;
    if existing.is_some() {
        info!("Database '{}' already exists", database.dbname);
        return Ok(false);
    }

    client
        .batch_execute(&format!("CREATE DATABASE {}", quote_identifier(&database.dbname)))
        .await?;
    info!("Database '{}' created successfully", database.dbname);
    Ok(true)
}

pub async fn create_tables(client: &Client) -> Result<()> {
    for (table, ddl) in CREATE_TABLES {
        debug!("Creating table {} if missing", table);
        client.batch_execute(ddl).await?;
    }
    info!("Tables {} ready", CREATE_TABLES.map(|(table, _)| table).join(", "));
    Ok(())
}

/// Convert an amount to the NUMERIC(10, 2) representation used by the tables.
pub fn to_numeric(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or(GeneratorError::Numeric(value))
}

/// PostgreSQL store: every worker gets its own connection and statements.
pub struct PgStore {
    postgres_config: PostgresConfig,
}

impl PgStore {
    pub fn new(database: &DatabaseConfig) -> Self {
        Self {
            postgres_config: database.postgres_config(),
        }
    }
}

pub struct PgWriter {
    client: Client,
    insert_payment: Statement,
    insert_buying_stats: Statement,
    insert_product: Statement,
    insert_account: Statement,
}

async fn prepare(
    client: &Client,
    worker_id: usize,
    statement: &'static str,
    sql: &str,
) -> Result<Statement> {
    client
        .prepare(sql)
        .await
        .map_err(|source| GeneratorError::Prepare { worker_id, statement, source })
}

#[async_trait]
impl RecordStore for PgStore {
    type Writer = PgWriter;

    async fn open_writer(&self, worker_id: usize) -> Result<PgWriter> {
        let client = connect(&self.postgres_config).await?;
        let insert_payment = prepare(&client, worker_id, "insertPayment", INSERT_PAYMENT).await?;
        let insert_buying_stats =
            prepare(&client, worker_id, "insertBuyingStats", INSERT_BUYING_STATS).await?;
        let insert_product = prepare(&client, worker_id, "insertProduct", INSERT_PRODUCT).await?;
        let insert_account = prepare(&client, worker_id, "insertAccount", INSERT_ACCOUNT).await?;
        debug!("Worker {} prepared its insert statements", worker_id);
        Ok(PgWriter {
            client,
            insert_payment,
            insert_buying_stats,
            insert_product,
            insert_account,
        })
    }
}

#[async_trait]
impl RecordWriter for PgWriter {
    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        let amount = to_numeric(payment.total_amount)?;
        self.client
            .execute(&self.insert_payment, &[&payment.serial, &amount, &payment.epoch])
            .await?;
        Ok(())
    }

    async fn insert_purchase_stat(&mut self, purchase_stat: &PurchaseStat) -> Result<()> {
        let total = to_numeric(purchase_stat.total_amount)?;
        self.client
            .execute(
                &self.insert_buying_stats,
                &[
                    &purchase_stat.user_id,
                    &purchase_stat.epoch,
                    &purchase_stat.product_id,
                    &purchase_stat.quantity,
                    &total,
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        let price = to_numeric(product.price)?;
        self.client
            .execute(
                &self.insert_product,
                &[&product.id, &product.name, &product.authors, &price],
            )
            .await?;
        Ok(())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<()> {
        self.client
            .execute(
                &self.insert_account,
                &[
                    &account.epoch,
                    &account.user_id,
                    &account.name,
                    &account.password,
                    &account.email,
                    &account.last_login,
                ],
            )
            .await?;
        Ok(())
    }
}
