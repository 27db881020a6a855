// BRENDA Mirror Storage Layer

use brenda_common::types::{EnzymeFactRow, EnzymeRow, MirrorTable, ProteinRow, TextFactRow};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use super::{IngestError, Result, MAX_BATCH_SIZE};

const SCHEMA: &str = r#"
DROP TABLE IF EXISTS text_facts;
DROP TABLE IF EXISTS enzyme_facts;
DROP TABLE IF EXISTS proteins;
DROP TABLE IF EXISTS enzymes;

CREATE TABLE enzymes (
    ec_number TEXT PRIMARY KEY,
    enzyme_id TEXT,
    recommended_name TEXT,
    systematic_name TEXT,
    reaction_summary TEXT,
    protein_count INTEGER,
    synonym_count INTEGER,
    reaction_count INTEGER,
    km_count INTEGER,
    turnover_count INTEGER,
    inhibitor_count INTEGER
);

CREATE TABLE proteins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ec_number TEXT NOT NULL,
    protein_id TEXT,
    organism TEXT,
    comment TEXT,
    reference_ids TEXT,
    raw_json TEXT,
    FOREIGN KEY (ec_number) REFERENCES enzymes (ec_number)
);

CREATE TABLE enzyme_facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ec_number TEXT NOT NULL,
    category TEXT NOT NULL,
    value TEXT,
    value_numeric_low REAL,
    value_numeric_high REAL,
    unit TEXT,
    context TEXT,
    comment TEXT,
    proteins TEXT,
    reference_ids TEXT,
    raw_json TEXT,
    FOREIGN KEY (ec_number) REFERENCES enzymes (ec_number)
);

CREATE TABLE text_facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ec_number TEXT NOT NULL,
    field_code TEXT NOT NULL,
    field_name TEXT,
    value_raw TEXT,
    value_text TEXT,
    protein_tokens TEXT,
    reference_tokens TEXT,
    qualifiers TEXT
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_proteins_ec ON proteins (ec_number);
CREATE INDEX IF NOT EXISTS idx_facts_ec ON enzyme_facts (ec_number);
CREATE INDEX IF NOT EXISTS idx_facts_category ON enzyme_facts (category);
CREATE INDEX IF NOT EXISTS idx_facts_value ON enzyme_facts (value);
CREATE INDEX IF NOT EXISTS idx_text_ec ON text_facts (ec_number);
CREATE INDEX IF NOT EXISTS idx_text_code ON text_facts (field_code);
"#;

/// Rows and batches written by this writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub enzymes: u64,
    pub proteins: u64,
    pub enzyme_facts: u64,
    pub text_facts: u64,
    /// Committed transactions
    pub batches: u64,
}

/// Row counts read back from the database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub enzymes: i64,
    pub proteins: i64,
    pub enzyme_facts: i64,
    pub text_facts: i64,
}

impl TableCounts {
    pub fn get(&self, table: MirrorTable) -> i64 {
        match table {
            MirrorTable::Enzymes => self.enzymes,
            MirrorTable::Proteins => self.proteins,
            MirrorTable::EnzymeFacts => self.enzyme_facts,
            MirrorTable::TextFacts => self.text_facts,
        }
    }
}

/// Sole writer of the mirror database
///
/// Rows are buffered per table and written in multi-row `INSERT`s of at most
/// `batch_size` rows, one transaction per batch. A record with more rows than
/// `batch_size` spans several batches. A failed batch is rolled back and reported as
/// [`IngestError::Write`].
pub struct MirrorWriter {
    pool: SqlitePool,
    batch_size: usize,
    enzymes: Vec<EnzymeRow>,
    proteins: Vec<ProteinRow>,
    facts: Vec<EnzymeFactRow>,
    text_facts: Vec<TextFactRow>,
    stats: WriteStats,
}

impl MirrorWriter {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path, batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Off)
            .pragma("temp_store", "MEMORY")
            .foreign_keys(false);

        // One connection: every statement goes through a single writer
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        debug!(path = %path.display(), batch_size, "Opened mirror database");

        Ok(Self {
            pool,
            batch_size,
            enzymes: Vec::with_capacity(batch_size),
            proteins: Vec::with_capacity(batch_size),
            facts: Vec::with_capacity(batch_size),
            text_facts: Vec::with_capacity(batch_size),
            stats: WriteStats::default(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Drop and recreate all four tables.
    pub async fn reset_schema(&mut self) -> Result<()> {
        self.enzymes.clear();
        self.proteins.clear();
        self.facts.clear();
        self.text_facts.clear();

        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Mirror schema reset");
        Ok(())
    }

    pub async fn push_enzyme(&mut self, row: EnzymeRow) -> Result<()> {
        self.enzymes.push(row);
        while self.enzymes.len() >= self.batch_size {
            self.flush_enzymes().await?;
        }
        Ok(())
    }

    pub async fn push_proteins(&mut self, rows: Vec<ProteinRow>) -> Result<()> {
        self.proteins.extend(rows);
        while self.proteins.len() >= self.batch_size {
            self.flush_proteins().await?;
        }
        Ok(())
    }

    pub async fn push_facts(&mut self, rows: Vec<EnzymeFactRow>) -> Result<()> {
        self.facts.extend(rows);
        while self.facts.len() >= self.batch_size {
            self.flush_facts().await?;
        }
        Ok(())
    }

    pub async fn push_text_fact(&mut self, row: TextFactRow) -> Result<()> {
        self.text_facts.push(row);
        while self.text_facts.len() >= self.batch_size {
            self.flush_text_facts().await?;
        }
        Ok(())
    }

    /// Write every buffered row, at most `batch_size` rows per transaction.
    pub async fn flush_all(&mut self) -> Result<()> {
        while !self.enzymes.is_empty() {
            self.flush_enzymes().await?;
        }
        while !self.proteins.is_empty() {
            self.flush_proteins().await?;
        }
        while !self.facts.is_empty() {
            self.flush_facts().await?;
        }
        while !self.text_facts.is_empty() {
            self.flush_text_facts().await?;
        }
        Ok(())
    }

    /// Build the query indexes. Run once, after all rows are written.
    pub async fn create_indexes(&self) -> Result<()> {
        info!("Creating mirror indexes");
        sqlx::raw_sql(INDEXES).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn table_counts(&self) -> Result<TableCounts> {
        let mut counts = TableCounts::default();
        for table in MirrorTable::ALL {
            let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
            let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
            match table {
                MirrorTable::Enzymes => counts.enzymes = count,
                MirrorTable::Proteins => counts.proteins = count,
                MirrorTable::EnzymeFacts => counts.enzyme_facts = count,
                MirrorTable::TextFacts => counts.text_facts = count,
            }
        }
        Ok(counts)
    }

    /// Flush remaining rows and close the pool.
    pub async fn close(mut self) -> Result<WriteStats> {
        self.flush_all().await?;
        self.pool.close().await;
        Ok(self.stats)
    }

    // ========================================================================
    // Batch inserts
    // ========================================================================

    async fn flush_enzymes(&mut self) -> Result<()> {
        let rows = self.enzymes.len().min(self.batch_size);
        if rows == 0 {
            return Ok(());
        }
        let table = MirrorTable::Enzymes;
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO enzymes (ec_number, enzyme_id, recommended_name, systematic_name, \
             reaction_summary, protein_count, synonym_count, reaction_count, km_count, \
             turnover_count, inhibitor_count) ",
        );
        query_builder.push_values(&self.enzymes[..rows], |mut b, row| {
            b.push_bind(row.ec_number.as_str())
                .push_bind(row.enzyme_id.as_deref())
                .push_bind(row.recommended_name.as_deref())
                .push_bind(row.systematic_name.as_deref())
                .push_bind(row.reaction_summary.as_deref())
                .push_bind(row.counts.protein_count)
                .push_bind(row.counts.synonym_count)
                .push_bind(row.counts.reaction_count)
                .push_bind(row.counts.km_count)
                .push_bind(row.counts.turnover_count)
                .push_bind(row.counts.inhibitor_count);
        });
        insert_batch(&self.pool, table, query_builder).await?;

        self.enzymes.drain(..rows);
        self.stats.enzymes += rows as u64;
        self.finish_batch(table, rows);
        Ok(())
    }

    async fn flush_proteins(&mut self) -> Result<()> {
        let rows = self.proteins.len().min(self.batch_size);
        if rows == 0 {
            return Ok(());
        }
        let table = MirrorTable::Proteins;
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO proteins (ec_number, protein_id, organism, comment, reference_ids, raw_json) ",
        );
        query_builder.push_values(&self.proteins[..rows], |mut b, row| {
            b.push_bind(row.ec_number.as_str())
                .push_bind(row.protein_id.as_deref())
                .push_bind(row.organism.as_deref())
                .push_bind(row.comment.as_deref())
                .push_bind(row.reference_ids.as_deref())
                .push_bind(row.raw_json.as_str());
        });
        insert_batch(&self.pool, table, query_builder).await?;

        self.proteins.drain(..rows);
        self.stats.proteins += rows as u64;
        self.finish_batch(table, rows);
        Ok(())
    }

    async fn flush_facts(&mut self) -> Result<()> {
        let rows = self.facts.len().min(self.batch_size);
        if rows == 0 {
            return Ok(());
        }
        let table = MirrorTable::EnzymeFacts;
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO enzyme_facts (ec_number, category, value, value_numeric_low, \
             value_numeric_high, unit, context, comment, proteins, reference_ids, raw_json) ",
        );
        query_builder.push_values(&self.facts[..rows], |mut b, row| {
            b.push_bind(row.ec_number.as_str())
                .push_bind(row.category.as_str())
                .push_bind(row.value.as_deref())
                .push_bind(row.value_numeric_low)
                .push_bind(row.value_numeric_high)
                .push_bind(row.unit.as_deref())
                .push_bind(row.context.as_deref())
                .push_bind(row.comment.as_deref())
                .push_bind(row.proteins.as_deref())
                .push_bind(row.reference_ids.as_deref())
                .push_bind(row.raw_json.as_str());
        });
        insert_batch(&self.pool, table, query_builder).await?;

        self.facts.drain(..rows);
        self.stats.enzyme_facts += rows as u64;
        self.finish_batch(table, rows);
        Ok(())
    }

    async fn flush_text_facts(&mut self) -> Result<()> {
        let rows = self.text_facts.len().min(self.batch_size);
        if rows == 0 {
            return Ok(());
        }
        let table = MirrorTable::TextFacts;
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO text_facts (ec_number, field_code, field_name, value_raw, value_text, \
             protein_tokens, reference_tokens, qualifiers) ",
        );
        query_builder.push_values(&self.text_facts[..rows], |mut b, row| {
            b.push_bind(row.ec_number.as_str())
                .push_bind(row.field_code.as_str())
                .push_bind(row.field_name.as_str())
                .push_bind(row.value_raw.as_str())
                .push_bind(row.value_text.as_str())
                .push_bind(row.protein_tokens.as_deref())
                .push_bind(row.reference_tokens.as_deref())
                .push_bind(row.qualifiers.as_deref());
        });
        insert_batch(&self.pool, table, query_builder).await?;

        self.text_facts.drain(..rows);
        self.stats.text_facts += rows as u64;
        self.finish_batch(table, rows);
        Ok(())
    }

    fn finish_batch(&mut self, table: MirrorTable, rows: usize) {
        self.stats.batches += 1;
        debug!(table = %table, rows, "Committed batch");
    }
}

/// Run one multi-row insert in its own transaction.
///
/// On error the transaction is dropped, which rolls the batch back.
async fn insert_batch(
    pool: &SqlitePool,
    table: MirrorTable,
    mut query_builder: QueryBuilder<'_, Sqlite>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    query_builder
        .build()
        .execute(&mut *tx)
        .await
        .map_err(IngestError::write(table))?;
    tx.commit().await.map_err(IngestError::write(table))?;
    Ok(())
}
