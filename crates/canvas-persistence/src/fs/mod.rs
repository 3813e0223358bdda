//! Registry de artifacts sobre un directorio scratch.
//!
//! Layout: un archivo por job completado, `<jobID>___<sufijo>`, con el
//! `Artifact` serializado como JSON indentado. El sufijo es un UUID v4 simple
//! para que escrituras concurrentes nunca colisionen en nombre.
//!
//! Búsqueda: se recorre el directorio y se compara la parte del nombre previa
//! al separador con el `JobId` por igualdad EXACTA. Un id que sea prefijo o
//! subcadena de otro no coincide. Si hay más de un registro para el mismo id
//! (escrituras de procesos distintos) gana el de nombre lexicográficamente
//! menor, para que la respuesta sea estable.
//!
//! Escritura: se escribe a un archivo oculto `.<nombre>.tmp` y se renombra;
//! un lector nunca ve un registro a medio escribir.
//!
//! No se borran registros: la limpieza del directorio es responsabilidad
//! operativa (p.ej. el reaper del directorio temporal del SO).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use canvas_core::constants::RECORD_SEPARATOR;
use canvas_core::{Artifact, ArtifactStore, JobId, StoreError};
use log::{debug, error, warn};
use uuid::Uuid;

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Abre (y crea si hace falta) el directorio scratch.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::ScratchDir(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// Store sobre el directorio temporal del SO.
    pub fn in_temp_dir() -> Result<Self, PersistenceError> {
        Self::open(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_name(job_id: &JobId) -> String {
        format!("{job_id}{RECORD_SEPARATOR}{}", Uuid::new_v4().simple())
    }

    /// Extrae el `JobId` de un nombre de registro, si lo es.
    fn job_id_of(file_name: &str) -> Option<JobId> {
        let (id, suffix) = file_name.split_once(RECORD_SEPARATOR)?;
        if suffix.is_empty() {
            return None;
        }
        JobId::parse(id).ok().filter(|parsed| parsed.as_str() == id)
    }

    /// Recorre el directorio y devuelve todos los registros (`JobId`, ruta).
    fn scan(&self) -> Result<Vec<(JobId, PathBuf)>, PersistenceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("scan:skip unreadable entry dir={} err={e}", self.dir.display());
                    continue;
                }
            };
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(job_id) = Self::job_id_of(name) {
                records.push((job_id, entry.path()));
            }
        }
        Ok(records)
    }

    fn find_record(&self, job_id: &JobId) -> Result<Option<PathBuf>, PersistenceError> {
        let mut matches: Vec<PathBuf> = self.scan()?
                                            .into_iter()
                                            .filter(|(id, _)| id == job_id)
                                            .map(|(_, path)| path)
                                            .collect();
        if matches.len() > 1 {
            warn!("find_record: {} records for job_id={job_id}, using the first by name", matches.len());
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }

    /// Lista los `JobId` con registro (ordenados, sin duplicados).
    pub fn list_job_ids(&self) -> Result<Vec<JobId>, PersistenceError> {
        let mut ids: Vec<JobId> = self.scan()?.into_iter().map(|(id, _)| id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub fn write_record(&self, job_id: &JobId, artifact: &Artifact) -> Result<bool, PersistenceError> {
        if self.find_record(job_id)?.is_some() {
            debug!("write_record: job_id={job_id} already stored, keeping first");
            return Ok(false);
        }
        let name = Self::record_name(job_id);
        let final_path = self.dir.join(&name);
        let tmp_path = self.dir.join(format!(".{name}.tmp"));
        let data = serde_json::to_vec_pretty(artifact).map_err(|e| PersistenceError::MalformedRecord { path: final_path.display().to_string(),
                                                                                                     job_id: job_id.to_string(),
                                                                                                     reason: e.to_string() })?;
        let mut file = fs::OpenOptions::new().write(true)
                                             .create_new(true)
                                             .open(&tmp_path)
                                             .map_err(|e| PersistenceError::io(&tmp_path, e))?;
        file.write_all(&data).map_err(|e| PersistenceError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(&tmp_path, e))?;
        drop(file);
        fs::rename(&tmp_path, &final_path).map_err(|e| PersistenceError::io(&final_path, e))?;
        debug!("write_record: job_id={job_id} path={}", final_path.display());
        Ok(true)
    }

    pub fn read_record(&self, job_id: &JobId) -> Result<Artifact, PersistenceError> {
        let path = self.find_record(job_id)?
                       .ok_or_else(|| PersistenceError::NotFound(job_id.to_string()))?;
        let data = fs::read(&path).map_err(|e| PersistenceError::io(&path, e))?;
        serde_json::from_slice(&data).map_err(|e| {
                                         error!("read_record: malformed record path={} err={e}", path.display());
                                         PersistenceError::MalformedRecord { path: path.display().to_string(),
                                                                             job_id: job_id.to_string(),
                                                                             reason: e.to_string() }
                                     })
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, job_id: &JobId, artifact: &Artifact) -> Result<bool, StoreError> {
        Ok(self.write_record(job_id, artifact)?)
    }

    fn get(&self, job_id: &JobId) -> Result<Artifact, StoreError> {
        Ok(self.read_record(job_id)?)
    }

    fn exists(&self, job_id: &JobId) -> Result<bool, StoreError> {
        Ok(self.find_record(job_id)?.is_some())
    }
}
