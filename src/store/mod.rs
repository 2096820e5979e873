// src/store/mod.rs

//! Persistent project store.
//!
//! Everything the pipeline must remember between runs lives here: the
//! registered projects, the active-project selection, the dependency edges
//! recorded by the last successful compile of each output, and the
//! deduplicated compile-error records.
//!
//! The store is backed by SQLite through `rusqlite`. It is not internally
//! synchronized; the worker thread owns its connection for the duration of
//! a build pass, and the host opens short-lived connections of its own for
//! metadata reads.
//!
//! Failure semantics: any storage-engine error is fatal (diagnostic, then
//! process exit). A store that can no longer read or write consistently
//! must not keep feeding the build graph; silent partial writes would
//! corrupt dependency and error state. The only non-errors are absences:
//! "no active project" and "no matching error record" are `None`.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::errors::fatal;

/// Stable project identity. Assigned by the store, never reused.
pub type ProjectId = i64;

/// Identity of a persisted compile-error record.
pub type ErrorId = i64;

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

CREATE TABLE IF NOT EXISTS Projects (
    ProjectID INTEGER PRIMARY KEY AUTOINCREMENT,
    Name TEXT NOT NULL,
    Directory TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Config (
    ActiveProject INTEGER,
    FOREIGN KEY(ActiveProject) REFERENCES Projects(ProjectID)
);

CREATE TABLE IF NOT EXISTS Dependencies (
    ProjectID INTEGER NOT NULL,
    InputPath TEXT NOT NULL,
    OutputPath TEXT NOT NULL,
    FOREIGN KEY(ProjectID) REFERENCES Projects(ProjectID)
);

CREATE TABLE IF NOT EXISTS Errors (
    ErrorID INTEGER PRIMARY KEY AUTOINCREMENT,
    ProjectID INTEGER NOT NULL,
    Hash INTEGER NOT NULL,
    Message TEXT NOT NULL,
    FOREIGN KEY(ProjectID) REFERENCES Projects(ProjectID)
);

CREATE TABLE IF NOT EXISTS ErrorInputs (
    ErrorID INTEGER NOT NULL,
    InputPath TEXT NOT NULL,
    FOREIGN KEY(ErrorID) REFERENCES Errors(ErrorID)
);

CREATE TABLE IF NOT EXISTS ErrorOutputs (
    ErrorID INTEGER NOT NULL,
    OutputPath TEXT NOT NULL,
    FOREIGN KEY(ErrorID) REFERENCES Errors(ErrorID)
);

INSERT INTO Config (ActiveProject)
SELECT null
WHERE NOT EXISTS (SELECT * FROM Config);
"#;

/// 64-bit hash of an ordered (inputs, outputs) path-list pair.
///
/// The digest is computed over the bare concatenation of the input paths
/// followed by the output paths, with no separators, truncated to the
/// first 8 bytes (big-endian). Two different list splits that concatenate
/// to the same byte sequence therefore share a hash; the hash is only an
/// index accelerator, and [`ProjectStore`] always confirms a candidate by
/// exact ordered comparison of both lists.
pub fn error_set_hash(inputs: &[String], outputs: &[String]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for path in inputs {
        hasher.update(path.as_bytes());
    }
    for path in outputs {
        hasher.update(path.as_bytes());
    }
    let digest = hasher.finalize();
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(first)
}

/// Connection to the project database.
pub struct ProjectStore {
    conn: Connection,
}

impl ProjectStore {
    /// Open the store at `path`, creating the schema if absent.
    pub fn create_or_open(path: &Path) -> Self {
        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(err) => fatal(&format!("opening project database at {path:?}: {err}")),
        };
        if let Err(err) = conn.execute_batch(SCHEMA) {
            fatal(&format!("initializing project database schema: {err}"));
        }
        Self { conn }
    }

    pub fn num_projects(&self) -> u32 {
        self.try_num_projects()
            .unwrap_or_else(|err| fatal(&format!("counting projects: {err}")))
    }

    fn try_num_projects(&self) -> rusqlite::Result<u32> {
        self.conn
            .prepare_cached("SELECT COUNT(*) FROM Projects")?
            .query_row([], |row| row.get(0))
    }

    /// IDs of all registered projects, in creation order.
    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.try_project_ids()
            .unwrap_or_else(|err| fatal(&format!("listing projects: {err}")))
    }

    fn try_project_ids(&self) -> rusqlite::Result<Vec<ProjectId>> {
        let mut stmt = self.conn.prepare_cached("SELECT ProjectID FROM Projects")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Display name of a project. Only call with IDs from [`Self::project_ids`].
    pub fn project_name(&self, id: ProjectId) -> String {
        self.try_project_field("SELECT Name FROM Projects WHERE ProjectID = ?1", id)
            .unwrap_or_else(|err| fatal(&format!("reading name of project {id}: {err}")))
    }

    /// Absolute root directory of a project.
    pub fn project_directory(&self, id: ProjectId) -> String {
        self.try_project_field("SELECT Directory FROM Projects WHERE ProjectID = ?1", id)
            .unwrap_or_else(|err| fatal(&format!("reading directory of project {id}: {err}")))
    }

    fn try_project_field(&self, sql: &str, id: ProjectId) -> rusqlite::Result<String> {
        self.conn
            .prepare_cached(sql)?
            .query_row(params![id], |row| row.get(0))
    }

    /// Register a new project and return its assigned ID.
    ///
    /// No uniqueness constraint: duplicate names and directories are
    /// permitted.
    pub fn add_project(&mut self, name: &str, directory: &str) -> ProjectId {
        self.try_add_project(name, directory)
            .unwrap_or_else(|err| fatal(&format!("adding project {name:?}: {err}")))
    }

    fn try_add_project(&mut self, name: &str, directory: &str) -> rusqlite::Result<ProjectId> {
        self.conn
            .prepare_cached("INSERT INTO Projects (Name, Directory) VALUES (?1, ?2)")?
            .execute(params![name, directory])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The globally selected project, if any.
    pub fn active_project(&self) -> Option<ProjectId> {
        self.try_active_project()
            .unwrap_or_else(|err| fatal(&format!("reading active project: {err}")))
    }

    fn try_active_project(&self) -> rusqlite::Result<Option<ProjectId>> {
        self.conn
            .prepare_cached("SELECT ActiveProject FROM Config")?
            .query_row([], |row| row.get(0))
    }

    pub fn set_active_project(&mut self, id: Option<ProjectId>) {
        self.try_set_active_project(id)
            .unwrap_or_else(|err| fatal(&format!("setting active project: {err}")))
    }

    fn try_set_active_project(&mut self, id: Option<ProjectId>) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached("UPDATE Config SET ActiveProject = ?1")?
            .execute(params![id])?;
        Ok(())
    }

    /// Delete every dependency edge recorded for `output`.
    ///
    /// Called at the start of an output's build step so a fresh edge set
    /// replaces, rather than accumulates onto, the previous one.
    pub fn clear_dependencies(&mut self, project: ProjectId, output: &str) {
        self.try_clear_dependencies(project, output)
            .unwrap_or_else(|err| fatal(&format!("clearing dependencies of {output:?}: {err}")))
    }

    fn try_clear_dependencies(&mut self, project: ProjectId, output: &str) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached("DELETE FROM Dependencies WHERE ProjectID = ?1 AND OutputPath = ?2")?
            .execute(params![project, output])?;
        Ok(())
    }

    /// Record one "output was produced from input" edge.
    pub fn record_dependency(&mut self, project: ProjectId, output: &str, input: &str) {
        self.try_record_dependency(project, output, input)
            .unwrap_or_else(|err| {
                fatal(&format!("recording dependency {input:?} -> {output:?}: {err}"))
            })
    }

    fn try_record_dependency(
        &mut self,
        project: ProjectId,
        output: &str,
        input: &str,
    ) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO Dependencies (ProjectID, InputPath, OutputPath) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![project, input, output])?;
        Ok(())
    }

    /// All outputs currently depending on `input`.
    pub fn dependents(&self, project: ProjectId, input: &str) -> Vec<String> {
        self.try_dependents(project, input)
            .unwrap_or_else(|err| fatal(&format!("querying dependents of {input:?}: {err}")))
    }

    fn try_dependents(&self, project: ProjectId, input: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT OutputPath FROM Dependencies WHERE ProjectID = ?1 AND InputPath = ?2",
        )?;
        let rows = stmt.query_map(params![project, input], |row| row.get(0))?;
        rows.collect()
    }

    /// Record a compile error for the given (inputs, outputs) set.
    ///
    /// Any existing record for the same set is deleted first; the fresh
    /// record and its path rows are inserted in the same transaction.
    pub fn record_error(
        &mut self,
        project: ProjectId,
        inputs: &[String],
        outputs: &[String],
        message: &str,
    ) {
        self.try_record_error(project, inputs, outputs, message)
            .unwrap_or_else(|err| fatal(&format!("recording compile error: {err}")))
    }

    fn try_record_error(
        &mut self,
        project: ProjectId,
        inputs: &[String],
        outputs: &[String],
        message: &str,
    ) -> rusqlite::Result<()> {
        let existing = self.try_find_error(project, inputs, outputs)?;
        let hash = error_set_hash(inputs, outputs) as i64;

        let tx = self.conn.transaction()?;
        if let Some(id) = existing {
            delete_error_rows(&tx, id)?;
        }
        tx.execute(
            "INSERT INTO Errors (ProjectID, Hash, Message) VALUES (?1, ?2, ?3)",
            params![project, hash, message],
        )?;
        let error_id = tx.last_insert_rowid();
        for input in inputs {
            tx.execute(
                "INSERT INTO ErrorInputs (ErrorID, InputPath) VALUES (?1, ?2)",
                params![error_id, input],
            )?;
        }
        for output in outputs {
            tx.execute(
                "INSERT INTO ErrorOutputs (ErrorID, OutputPath) VALUES (?1, ?2)",
                params![error_id, output],
            )?;
        }
        tx.commit()
    }

    /// Delete the error record for the given set, if one exists.
    pub fn clear_error(&mut self, project: ProjectId, inputs: &[String], outputs: &[String]) {
        self.try_clear_error(project, inputs, outputs)
            .unwrap_or_else(|err| fatal(&format!("clearing compile error: {err}")))
    }

    fn try_clear_error(
        &mut self,
        project: ProjectId,
        inputs: &[String],
        outputs: &[String],
    ) -> rusqlite::Result<()> {
        let Some(id) = self.try_find_error(project, inputs, outputs)? else {
            return Ok(());
        };
        let tx = self.conn.transaction()?;
        delete_error_rows(&tx, id)?;
        tx.commit()
    }

    /// IDs of every persisted error record for the project.
    pub fn error_ids(&self, project: ProjectId) -> Vec<ErrorId> {
        self.try_error_ids(project)
            .unwrap_or_else(|err| fatal(&format!("listing compile errors: {err}")))
    }

    fn try_error_ids(&self, project: ProjectId) -> rusqlite::Result<Vec<ErrorId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT ErrorID FROM Errors WHERE ProjectID = ?1")?;
        let rows = stmt.query_map(params![project], |row| row.get(0))?;
        rows.collect()
    }

    pub fn error_message(&self, id: ErrorId) -> String {
        self.try_error_message(id)
            .unwrap_or_else(|err| fatal(&format!("reading message of error {id}: {err}")))
    }

    fn try_error_message(&self, id: ErrorId) -> rusqlite::Result<String> {
        self.conn
            .prepare_cached("SELECT Message FROM Errors WHERE ErrorID = ?1")?
            .query_row(params![id], |row| row.get(0))
    }

    /// Input paths of an error record, in insertion order.
    pub fn error_inputs(&self, id: ErrorId) -> Vec<String> {
        self.try_error_paths(
            "SELECT InputPath FROM ErrorInputs WHERE ErrorID = ?1 ORDER BY rowid",
            id,
        )
        .unwrap_or_else(|err| fatal(&format!("reading inputs of error {id}: {err}")))
    }

    /// Output paths of an error record, in insertion order.
    pub fn error_outputs(&self, id: ErrorId) -> Vec<String> {
        self.try_error_paths(
            "SELECT OutputPath FROM ErrorOutputs WHERE ErrorID = ?1 ORDER BY rowid",
            id,
        )
        .unwrap_or_else(|err| fatal(&format!("reading outputs of error {id}: {err}")))
    }

    fn try_error_paths(&self, sql: &str, id: ErrorId) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        rows.collect()
    }

    /// Locate the error record matching the exact ordered (inputs, outputs)
    /// pair, or `None`.
    ///
    /// The hash narrows the candidates; the identity check is the ordered
    /// comparison of both stored path lists. A hash collision between
    /// unrelated sets must never merge their diagnostics.
    pub fn find_error(
        &self,
        project: ProjectId,
        inputs: &[String],
        outputs: &[String],
    ) -> Option<ErrorId> {
        self.try_find_error(project, inputs, outputs)
            .unwrap_or_else(|err| fatal(&format!("looking up compile error: {err}")))
    }

    fn try_find_error(
        &self,
        project: ProjectId,
        inputs: &[String],
        outputs: &[String],
    ) -> rusqlite::Result<Option<ErrorId>> {
        let hash = error_set_hash(inputs, outputs) as i64;
        let candidates: Vec<ErrorId> = {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT ErrorID FROM Errors WHERE ProjectID = ?1 AND Hash = ?2")?;
            let rows = stmt.query_map(params![project, hash], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        for id in candidates {
            if self.try_error_paths(
                "SELECT InputPath FROM ErrorInputs WHERE ErrorID = ?1 ORDER BY rowid",
                id,
            )? == inputs
                && self.try_error_paths(
                    "SELECT OutputPath FROM ErrorOutputs WHERE ErrorID = ?1 ORDER BY rowid",
                    id,
                )? == outputs
            {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

fn delete_error_rows(tx: &rusqlite::Transaction<'_>, id: ErrorId) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM ErrorInputs WHERE ErrorID = ?1", params![id])?;
    tx.execute("DELETE FROM ErrorOutputs WHERE ErrorID = ?1", params![id])?;
    tx.execute("DELETE FROM Errors WHERE ErrorID = ?1", params![id])?;
    Ok(())
}
