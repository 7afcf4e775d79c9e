use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use rand::rngs::StdRng;
use tokio::task::JoinSet;

use crate::attributes::{AttributeBundle, AttributeSource};
use crate::common::worker_rng;
use crate::config::RunConfig;
use crate::derive::{derive_cycle, DerivedCycle};
use crate::dispatcher::{spawn_dispatcher, IndexStream};
use crate::error::{GeneratorError, Result};
use crate::sink::{InsertionSink, RecordStore, WRITES_PER_CYCLE};

/// What one worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub cycles: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
}

/// Result of a complete run.
///
/// `requested` is what the caller asked for; the other counts are aggregated
/// from the workers' own reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub requested: u64,
    pub dispatched: u64,
    pub cycles: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
    pub workers: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn absorb(&mut self, report: WorkerReport) {
        self.cycles += report.cycles;
        self.writes_succeeded += report.writes_succeeded;
        self.writes_failed += report.writes_failed;
        self.workers += 1;
    }

    pub fn writes_attempted(&self) -> u64 {
        self.cycles * WRITES_PER_CYCLE
    }

    pub fn records_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.cycles as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Run `config.records` cycles over `config.num_workers` concurrent workers.
///
/// Blocks until every worker has drained the index queue. The first fatal
/// worker error stops the remaining workers and is returned as is; records
/// already inserted stay in the store.
pub async fn populate<S, A>(config: &RunConfig, store: Arc<S>, source: A) -> Result<RunSummary>
where
    S: RecordStore,
    A: AttributeSource,
{
    let start = Instant::now();
    let settings = Arc::new(config.clone());
    let (indices, dispatcher) = spawn_dispatcher(config.records, config.queue_depth);

    let mut workers = JoinSet::new();
    for worker_id in 0..config.num_workers {
        workers.spawn(run_worker(
            worker_id,
            Arc::clone(&store),
            source.clone(),
            worker_rng(config.seed, worker_id),
            indices.clone(),
            Arc::clone(&settings),
        ));
    }
    drop(indices);

    info!("Wait for all {} workers to finish", config.num_workers);
    let mut summary = RunSummary {
        requested: config.records,
        ..RunSummary::default()
    };
    while let Some(joined) = workers.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(join_error) => Err(GeneratorError::from(join_error)),
        };
        match result {
            Ok(report) => {
                info!("Worker {} processed {} records", report.worker_id, report.cycles);
                summary.absorb(report);
            }
            Err(e) => {
                error!("Stopping run after fatal worker error: {}", e);
                workers.abort_all();
                dispatcher.abort();
                return Err(e);
            }
        }
    }
    info!("All workers have finished");

    summary.dispatched = dispatcher.await?;
    summary.elapsed = start.elapsed();
    Ok(summary)
}

async fn run_worker<S, A>(
    worker_id: usize,
    store: Arc<S>,
    mut source: A,
    mut rng: StdRng,
    indices: IndexStream,
    settings: Arc<RunConfig>,
) -> Result<WorkerReport>
where
    S: RecordStore,
    A: AttributeSource,
{
    info!("Starting worker {}", worker_id);
    let mut sink = InsertionSink::new(store.open_writer(worker_id).await?);
    let progress_interval = settings.progress_interval();
    let mut report = WorkerReport {
        worker_id,
        ..WorkerReport::default()
    };

    while let Some(record_id) = indices.next().await {
        let bundle = source.next_bundle(record_id, &mut rng)?;
        let cycle = derive_cycle(&bundle, &settings.ranges, &mut rng);
        log_cycle(worker_id, record_id, &bundle, &cycle, settings.verbose);

        let outcome = sink.apply(&cycle).await;
        report.cycles += 1;
        report.writes_succeeded += outcome.succeeded;
        report.writes_failed += outcome.failed;

        if is_progress_record(record_id, progress_interval) {
            info!("Inserted record {} of {}", record_id, settings.records);
        }
    }

    info!("Worker {} stopping after {} records", worker_id, report.cycles);
    Ok(report)
}

fn is_progress_record(record_id: u64, interval: u64) -> bool {
    record_id % interval == 0
}

fn cycle_log_level(verbose: bool) -> log::Level {
    if verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

fn log_cycle(
    worker_id: usize,
    record_id: u64,
    bundle: &AttributeBundle,
    cycle: &DerivedCycle,
    verbose: bool,
) {
    let level = cycle_log_level(verbose);
    if !log::log_enabled!(level) {
        return;
    }
    let DerivedCycle {
        payment,
        purchase_stat,
        product,
        account,
    } = cycle;
    log::log!(level, "Worker {} record {}", worker_id, record_id);
    log::log!(level, "paymentSerial       : {}", payment.serial);
    log::log!(level, "paymentQuantity     : {}", purchase_stat.quantity);
    log::log!(level, "paymentEpoch        : {}", payment.epoch);
    log::log!(level, "paymentTotalAmount  : {}", payment.total_amount);
    log::log!(level, "productID           : {}", product.id);
    log::log!(level, "productAuthors      : {}", product.authors);
    log::log!(level, "productName         : {}", product.name);
    log::log!(level, "productPrice        : {}", product.price);
    log::log!(level, "userID              : {}", account.user_id);
    log::log!(level, "userEpoch           : {}", account.epoch);
    log::log!(level, "userName            : {}", account.name);
    log::log!(level, "userEmail           : {}", account.email);
    log::log!(level, "userPwd             : {}", account.password);
    log::log!(level, "userPhone           : {}", bundle.phone_number);
    log::log!(level, "userLastLogin       : {}", account.last_login);
}
