use std::path::{Path, PathBuf};

use canvas_core::{fingerprint, fingerprint_image, Artifact, ArtifactStore, JobId, ProofStatus, StoreError};
use canvas_persistence::{FsArtifactStore, StoreConfig};
use canvas_policies::{AdmissionPolicy, PasteRatioPolicy, DEFAULT_MARKER};
use serde_json::json;

const USAGE: &str = "Uso:
  canvas-cli fingerprint <archivo|data-uri>
  canvas-cli check-logs <texto> [--marker <M>]
  canvas-cli status <imageID> [--dir <scratch>]
  canvas-cli list [--dir <scratch>]";

// Códigos de salida
const EXIT_REJECTED: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_INPUT: i32 = 3;
const EXIT_NOT_FOUND: i32 = 4;
const EXIT_IO: i32 = 5;

fn main() {
    // Cargar .env si existe para SCRATCH_DIR / ADMISSION_MARKER
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match args.first().map(String::as_str) {
        Some("fingerprint") => cmd_fingerprint(&args[1..]),
        Some("check-logs") => cmd_check_logs(&args[1..]),
        Some("status") => cmd_status(&args[1..]),
        Some("list") => cmd_list(&args[1..]),
        _ => {
            eprintln!("{USAGE}");
            EXIT_USAGE
        }
    };
    std::process::exit(code);
}

/// Separa los posicionales de las opciones `--clave valor`.
fn split_args(args: &[String]) -> (Vec<String>, Vec<(String, String)>) {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if let Some(key) = args[i].strip_prefix("--") {
            i += 1;
            if i < args.len() {
                options.push((key.to_string(), args[i].clone()));
            }
        } else {
            positional.push(args[i].clone());
        }
        i += 1;
    }
    (positional, options)
}

fn option<'a>(options: &'a [(String, String)], key: &str) -> Option<&'a str> {
    options.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Id de un data-URI literal o del contenido de un archivo. Un archivo que
/// contiene un data-URI se trata igual que el literal.
fn fingerprint_input(input: &str) -> Result<JobId, String> {
    if input.starts_with("data:") {
        return Ok(fingerprint_image(input));
    }
    let bytes = std::fs::read(input).map_err(|e| format!("{input}: {e}"))?;
    match std::str::from_utf8(&bytes) {
        Ok(text) if text.trim_start().starts_with("data:") => Ok(fingerprint_image(text.trim())),
        _ => Ok(fingerprint(&bytes)),
    }
}

fn cmd_fingerprint(args: &[String]) -> i32 {
    let (positional, _) = split_args(args);
    let Some(input) = positional.first() else {
        eprintln!("Uso: canvas-cli fingerprint <archivo|data-uri>");
        return EXIT_USAGE;
    };
    match fingerprint_input(input) {
        Ok(id) => {
            println!("{id}");
            0
        }
        Err(e) => {
            eprintln!("[canvas fingerprint] {e}");
            EXIT_IO
        }
    }
}

fn cmd_check_logs(args: &[String]) -> i32 {
    let (positional, options) = split_args(args);
    let Some(text) = positional.first() else {
        eprintln!("Uso: canvas-cli check-logs <texto> [--marker <M>]");
        return EXIT_USAGE;
    };
    let marker = option(&options, "marker").map(str::to_string)
                                           .or_else(|| std::env::var("ADMISSION_MARKER").ok())
                                           .unwrap_or_else(|| DEFAULT_MARKER.to_string());
    let policy = PasteRatioPolicy::new(marker);
    let decision = policy.evaluate(text);
    println!("{}",
             json!({ "policy": policy.policy_id(), "marker": policy.marker(), "decision": decision }));
    if decision.accepted {
        0
    } else {
        EXIT_REJECTED
    }
}

fn scratch_dir(options: &[(String, String)]) -> Result<PathBuf, String> {
    if let Some(dir) = option(options, "dir") {
        return Ok(PathBuf::from(dir));
    }
    StoreConfig::from_env().map(|c| c.scratch_dir).map_err(|e| e.to_string())
}

fn open_store(options: &[(String, String)]) -> Result<FsArtifactStore, i32> {
    let dir = scratch_dir(options).map_err(|e| {
                                      eprintln!("[canvas] config: {e}");
                                      EXIT_USAGE
                                  })?;
    FsArtifactStore::open(&dir).map_err(|e| {
                                   eprintln!("[canvas] store: {e}");
                                   EXIT_IO
                               })
}

/// Respuesta con la misma forma que `GET /proof_status`.
fn status_body(store: &dyn ArtifactStore, id: &JobId) -> Result<serde_json::Value, StoreError> {
    let (status, artifact) = match store.get(id) {
        Ok(a) => (ProofStatus::Proven, a),
        Err(e) if e.is_not_found() => (ProofStatus::Unproven, Artifact::blank()),
        Err(e) => return Err(e),
    };
    Ok(json!({ "proofStatus": status, "ZKproof": artifact }))
}

fn cmd_status(args: &[String]) -> i32 {
    let (positional, options) = split_args(args);
    let Some(raw) = positional.first() else {
        eprintln!("Uso: canvas-cli status <imageID> [--dir <scratch>]");
        return EXIT_USAGE;
    };
    let id = match JobId::parse(raw) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("[canvas status] {e}");
            return EXIT_INPUT;
        }
    };
    let store = match open_store(&options) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match status_body(&store, &id) {
        Ok(body) => {
            println!("{body}");
            if body["proofStatus"] == "proven" {
                0
            } else {
                EXIT_NOT_FOUND
            }
        }
        Err(e) => {
            eprintln!("[canvas status] {e}");
            EXIT_IO
        }
    }
}

fn list_ids(dir: &Path) -> Result<Vec<JobId>, String> {
    let store = FsArtifactStore::open(dir).map_err(|e| e.to_string())?;
    store.list_job_ids().map_err(|e| e.to_string())
}

fn cmd_list(args: &[String]) -> i32 {
    let (_, options) = split_args(args);
    let dir = match scratch_dir(&options) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[canvas list] config: {e}");
            return EXIT_USAGE;
        }
    };
    match list_ids(&dir) {
        Ok(ids) => {
            for id in ids {
                println!("{id}");
            }
            0
        }
        Err(e) => {
            eprintln!("[canvas list] {e}");
            EXIT_IO
        }
    }
}
