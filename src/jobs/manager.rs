//! Tabla de jobs y despacho en segundo plano.
//!
//! - Single-flight por `JobId`: el check-and-insert se hace con la entry API
//!   del `DashMap`, así dos admisiones concurrentes del mismo contenido
//!   lanzan un único worker.
//! - Pool acotado: un `Semaphore` con `max_concurrent` permisos. Un job queda
//!   `pending` hasta obtener permiso y pasa a `running`.
//! - Timeout por job y cancelación (individual o global en `shutdown`) vía
//!   canales `watch`. El trabajo corre en su propia tarea para poder abortarlo.
//! - Un job `failed` puede redespacharse: nuevo intento, `attempt + 1`.
//! - Los registros terminales se podan al despachar una vez pasado
//!   `retention`. Un job completado sigue respondiendo `proven` desde el
//!   registry, que es la fuente de verdad.

use std::sync::Arc;
use std::time::Duration;

use canvas_core::{ArtifactStore, JobId, JobRecord, JobState, StoreError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use super::blocking::with_store;
use super::worker::{JobError, JobWorker};
use crate::config::JobsConfig;

/// Resultado de intentar despachar un job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Worker lanzado; `attempt` empieza en 1.
    Spawned { attempt: u32 },
    /// Ya hay un job vivo o completado para este id.
    AlreadyKnown(JobState),
    /// El registry ya tiene el artifact.
    AlreadyProven,
    /// El manager está cerrándose y no acepta trabajo nuevo.
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

struct Inner {
    table: DashMap<JobId, JobRecord>,
    handles: DashMap<JobId, JoinHandle<()>>,
    cancels: DashMap<JobId, watch::Sender<bool>>,
    shutdown: watch::Sender<bool>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retention: Duration,
    worker: Arc<JobWorker>,
}

#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl JobManager {
    pub fn new(worker: JobWorker, config: JobsConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { inner: Arc::new(Inner { table: DashMap::new(),
                                       handles: DashMap::new(),
                                       cancels: DashMap::new(),
                                       shutdown,
                                       permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                                       timeout: config.timeout,
                                       retention: config.retention,
                                       worker: Arc::new(worker) }) }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        self.inner.worker.store()
    }

    /// Despacha un worker si ni el registry ni la tabla conocen el id.
    /// Nunca espera al worker.
    pub async fn dispatch(&self, job_id: JobId, image: String) -> Result<DispatchOutcome, StoreError> {
        if *self.inner.shutdown.borrow() {
            return Ok(DispatchOutcome::ShuttingDown);
        }
        let key = job_id.clone();
        if with_store(self.store(), move |store| store.exists(&key)).await? {
            debug!("dispatch: job_id={job_id} already proven");
            return Ok(DispatchOutcome::AlreadyProven);
        }
        self.prune_expired();

        let attempt = match self.inner.table.entry(job_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get().state;
                if state != JobState::Failed {
                    return Ok(DispatchOutcome::AlreadyKnown(state));
                }
                let attempt = occupied.get().attempt + 1;
                occupied.insert(JobRecord::pending(job_id.clone(), attempt));
                attempt
            }
            Entry::Vacant(vacant) => {
                vacant.insert(JobRecord::pending(job_id.clone(), 1));
                1
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.inner.cancels.insert(job_id.clone(), cancel_tx);
        self.inner.handles.retain(|_, handle| !handle.is_finished());

        let inner = Arc::clone(&self.inner);
        let shutdown_rx = self.inner.shutdown.subscribe();
        let handle = tokio::spawn(drive(inner, job_id.clone(), image, cancel_rx, shutdown_rx));
        self.inner.handles.insert(job_id.clone(), handle);
        info!("dispatch: job_id={job_id} attempt={attempt}");
        Ok(DispatchOutcome::Spawned { attempt })
    }

    /// Quita de la tabla los registros terminales más viejos que `retention`.
    /// Devuelve cuántos se quitaron.
    pub fn prune_expired(&self) -> usize {
        let retention = self.inner.retention;
        let mut pruned = 0;
        self.inner.table.retain(|_, rec| {
                            let keep = !rec.expired(retention);
                            pruned += usize::from(!keep);
                            keep
                        });
        if pruned > 0 {
            debug!("jobs:prune removed={pruned}");
        }
        pruned
    }

    pub fn state(&self, job_id: &JobId) -> Option<JobState> {
        self.inner.table.get(job_id).map(|rec| rec.state)
    }

    pub fn snapshot(&self, job_id: &JobId) -> Option<JobRecord> {
        self.inner.table.get(job_id).map(|rec| rec.clone())
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for rec in self.inner.table.iter() {
            match rec.state {
                JobState::Pending => counts.pending += 1,
                JobState::Running => counts.running += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Pide la cancelación de un job vivo. `false` si no hay nada que cancelar.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self.inner.cancels.get(job_id) {
            Some(tx) => {
                tx.send_replace(true);
                info!("cancel: job_id={job_id}");
                true
            }
            None => false,
        }
    }

    /// Cancela todos los jobs vivos, rechaza despachos nuevos y espera a que
    /// las tareas terminen.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        self.inner.permits.close();
        let ids: Vec<JobId> = self.inner.handles.iter().map(|e| e.key().clone()).collect();
        info!("shutdown: waiting for {} job task(s)", ids.len());
        for id in ids {
            if let Some((_, handle)) = self.inner.handles.remove(&id) {
                if let Err(e) = handle.await {
                    warn!("shutdown: job_id={id} task ended abnormally: {e}");
                }
            }
        }
    }
}

/// Resuelve cuando el emisor marca `true`. Si el emisor desaparece nadie
/// puede ya cancelar y no resuelve nunca.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn drive(inner: Arc<Inner>,
               job_id: JobId,
               image: String,
               mut cancel_rx: watch::Receiver<bool>,
               mut shutdown_rx: watch::Receiver<bool>) {
    let permit = tokio::select! {
        acquired = Arc::clone(&inner.permits).acquire_owned() => acquired.ok(),
        _ = cancelled(&mut cancel_rx) => None,
        _ = cancelled(&mut shutdown_rx) => None,
    };
    let Some(_permit) = permit else {
        finish(&inner, &job_id, Err(JobError::Cancelled));
        return;
    };
    mark_running(&inner, &job_id);

    let worker = Arc::clone(&inner.worker);
    let id = job_id.clone();
    let mut task = tokio::spawn(async move { worker.run(&id, &image).await.map(|_| ()) });
    let result = tokio::select! {
        joined = tokio::time::timeout(inner.timeout, &mut task) => match joined {
            Ok(Ok(run)) => run,
            Ok(Err(join_err)) => Err(JobError::Panicked(join_err.to_string())),
            Err(_) => {
                task.abort();
                Err(JobError::TimedOut(inner.timeout))
            }
        },
        _ = cancelled(&mut cancel_rx) => {
            task.abort();
            Err(JobError::Cancelled)
        },
        _ = cancelled(&mut shutdown_rx) => {
            task.abort();
            Err(JobError::Cancelled)
        },
    };
    finish(&inner, &job_id, result);
}

fn mark_running(inner: &Inner, job_id: &JobId) {
    if let Some(mut rec) = inner.table.get_mut(job_id) {
        if let Err(e) = rec.transition(JobState::Running, None) {
            warn!("job:state job_id={job_id} err={e}");
        }
    }
    debug!("job:running job_id={job_id}");
}

fn finish(inner: &Inner, job_id: &JobId, result: Result<(), JobError>) {
    // el emisor se quita antes de publicar el estado terminal, para no pisar
    // el de un intento nuevo
    inner.cancels.remove(job_id);
    let (next, error) = match result {
        Ok(()) => (JobState::Completed, None),
        Err(e) => {
            warn!("job:failed job_id={job_id} err={e}");
            (JobState::Failed, Some(e.to_string()))
        }
    };
    if let Some(mut rec) = inner.table.get_mut(job_id) {
        if let Err(e) = rec.transition(next, error) {
            warn!("job:state job_id={job_id} err={e}");
        }
    }
}
