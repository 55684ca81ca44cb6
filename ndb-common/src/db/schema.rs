//! Table definitions for the four stores
//!
//! All statements are `CREATE ... IF NOT EXISTS` and safe to run on every
//! startup. Reference tables have identical layouts in their source store and
//! in the search store so they can be mirrored row-for-row.

use crate::atlas::AtlasVersion;
use crate::db::init::StoreKind;
use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

const BRAIN_AREA_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS brain_area (
        id TEXT PRIMARY KEY,
        structure_id INTEGER NOT NULL,
        depth INTEGER NOT NULL DEFAULT 0,
        name TEXT NOT NULL,
        safe_name TEXT NOT NULL DEFAULT '',
        acronym TEXT NOT NULL DEFAULT '',
        parent_structure_id INTEGER,
        structure_id_path TEXT NOT NULL DEFAULT '',
        geometry_color TEXT NOT NULL DEFAULT '',
        geometry_file TEXT NOT NULL DEFAULT '',
        geometry_enable INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    )
"#;

const MOUSE_STRAIN_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS mouse_strain (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const STRUCTURE_IDENTIFIER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS structure_identifier (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        value INTEGER NOT NULL,
        mutable INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL
    )
"#;

const TRACING_STRUCTURE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tracing_structure (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        value INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

/// Create all tables belonging to one store
pub async fn create_schema(kind: StoreKind, pool: &SqlitePool) -> Result<()> {
    let statements = match kind {
        StoreKind::Sample => sample_store_statements(),
        StoreKind::RawTracing => raw_tracing_store_statements(),
        StoreKind::RegisteredTracing => registered_tracing_store_statements(),
        StoreKind::Search => search_store_statements(),
    };

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    debug!(store = %kind, statements = statements.len(), "Schema ensured");
    Ok(())
}

fn sample_store_statements() -> Vec<String> {
    vec![
        BRAIN_AREA_TABLE.to_string(),
        MOUSE_STRAIN_TABLE.to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS sample (
            id TEXT PRIMARY KEY,
            id_number INTEGER NOT NULL DEFAULT 0,
            animal_id TEXT NOT NULL DEFAULT '',
            tag TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            sample_date TEXT,
            sharing INTEGER NOT NULL DEFAULT 0,
            mouse_strain_id TEXT,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS injection (
            id TEXT PRIMARY KEY,
            sample_id TEXT NOT NULL REFERENCES sample(id),
            brain_area_id TEXT,
            injection_virus_id TEXT,
            fluorophore_id TEXT,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS neuron (
            id TEXT PRIMARY KEY,
            id_number INTEGER NOT NULL DEFAULT 0,
            id_string TEXT NOT NULL DEFAULT '',
            tag TEXT NOT NULL DEFAULT '',
            keywords TEXT NOT NULL DEFAULT '',
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            z REAL NOT NULL DEFAULT 0,
            sharing INTEGER NOT NULL DEFAULT 0,
            doi TEXT,
            consensus INTEGER NOT NULL DEFAULT 0,
            metadata TEXT,
            brain_area_id TEXT,
            injection_id TEXT NOT NULL REFERENCES injection(id),
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
    ]
}

fn raw_tracing_store_statements() -> Vec<String> {
    vec![
        STRUCTURE_IDENTIFIER_TABLE.to_string(),
        TRACING_STRUCTURE_TABLE.to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS swc_tracing (
            id TEXT PRIMARY KEY,
            neuron_id TEXT NOT NULL,
            tracing_structure_id TEXT,
            filename TEXT NOT NULL DEFAULT '',
            annotator TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
    ]
}

fn registered_tracing_store_statements() -> Vec<String> {
    let mut statements = vec![
        r#"
        CREATE TABLE IF NOT EXISTS tracing (
            id TEXT PRIMARY KEY,
            swc_tracing_id TEXT,
            registration_transform_id TEXT,
            node_count INTEGER NOT NULL DEFAULT 0,
            path_count INTEGER NOT NULL DEFAULT 0,
            branch_count INTEGER NOT NULL DEFAULT 0,
            end_count INTEGER NOT NULL DEFAULT 0,
            transformed_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS tracing_node (
            id TEXT PRIMARY KEY,
            tracing_id TEXT NOT NULL REFERENCES tracing(id),
            sample_number INTEGER NOT NULL,
            parent_number INTEGER NOT NULL,
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            z REAL NOT NULL DEFAULT 0,
            radius REAL NOT NULL DEFAULT 0,
            length_to_parent REAL NOT NULL DEFAULT 0,
            structure_identifier_id TEXT,
            brain_area_id_ccf_v25 TEXT,
            brain_area_id_ccf_v30 TEXT,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_tracing_node_tracing ON tracing_node(tracing_id)".to_string(),
    ];

    for version in AtlasVersion::ALL {
        statements.push(format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                tracing_id TEXT NOT NULL REFERENCES tracing(id),
                brain_area_id TEXT NOT NULL,
                node_count INTEGER NOT NULL DEFAULT 0,
                soma_count INTEGER NOT NULL DEFAULT 0,
                path_count INTEGER NOT NULL DEFAULT 0,
                branch_count INTEGER NOT NULL DEFAULT 0,
                end_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#,
            table = version.source_content_table()
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_tracing ON {table}(tracing_id)",
            table = version.source_content_table()
        ));
    }

    statements
}

fn search_store_statements() -> Vec<String> {
    let mut statements = vec![
        BRAIN_AREA_TABLE.to_string(),
        MOUSE_STRAIN_TABLE.to_string(),
        STRUCTURE_IDENTIFIER_TABLE.to_string(),
        TRACING_STRUCTURE_TABLE.to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS sample (
            id TEXT PRIMARY KEY,
            id_number INTEGER NOT NULL DEFAULT 0,
            animal_id TEXT NOT NULL DEFAULT '',
            tag TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            sample_date TEXT,
            mouse_strain_id TEXT,
            search_scope INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS neuron (
            id TEXT PRIMARY KEY,
            id_number INTEGER NOT NULL DEFAULT 0,
            id_string TEXT NOT NULL DEFAULT '',
            tag TEXT NOT NULL DEFAULT '',
            keywords TEXT NOT NULL DEFAULT '',
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            z REAL NOT NULL DEFAULT 0,
            doi TEXT,
            consensus INTEGER NOT NULL DEFAULT 0,
            search_scope INTEGER NOT NULL,
            brain_area_id TEXT,
            sample_id TEXT NOT NULL REFERENCES sample(id),
            manual_soma_compartment_id TEXT,
            legacy_soma_ids TEXT,
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS tracing (
            id TEXT PRIMARY KEY,
            neuron_id TEXT NOT NULL REFERENCES neuron(id),
            tracing_structure_id TEXT,
            swc_tracing_id TEXT,
            node_count INTEGER NOT NULL DEFAULT 0,
            path_count INTEGER NOT NULL DEFAULT 0,
            branch_count INTEGER NOT NULL DEFAULT 0,
            end_count INTEGER NOT NULL DEFAULT 0,
            transformed_at TEXT,
            search_scope INTEGER NOT NULL,
            soma_id TEXT REFERENCES tracing_node(id),
            updated_at TEXT NOT NULL
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS tracing_node (
            id TEXT PRIMARY KEY,
            tracing_id TEXT NOT NULL REFERENCES tracing(id),
            sample_number INTEGER NOT NULL,
            parent_number INTEGER NOT NULL,
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            z REAL NOT NULL DEFAULT 0,
            radius REAL NOT NULL DEFAULT 0,
            length_to_parent REAL NOT NULL DEFAULT 0,
            structure_identifier_id TEXT,
            brain_area_id_ccf_v25 TEXT,
            brain_area_id_ccf_v30 TEXT
        )
        "#
        .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_search_node_tracing ON tracing_node(tracing_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_search_node_structure ON tracing_node(structure_identifier_id)"
            .to_string(),
    ];

    for version in AtlasVersion::ALL {
        statements.push(format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                tracing_id TEXT NOT NULL REFERENCES tracing(id),
                neuron_id TEXT NOT NULL REFERENCES neuron(id),
                brain_area_id TEXT NOT NULL,
                neuron_id_string TEXT NOT NULL DEFAULT '',
                neuron_doi TEXT,
                neuron_consensus INTEGER NOT NULL DEFAULT 0,
                manual_soma_compartment_id TEXT,
                legacy_soma_ids TEXT,
                search_scope INTEGER NOT NULL,
                soma_x REAL NOT NULL DEFAULT 0,
                soma_y REAL NOT NULL DEFAULT 0,
                soma_z REAL NOT NULL DEFAULT 0,
                node_count INTEGER NOT NULL DEFAULT 0,
                soma_count INTEGER NOT NULL DEFAULT 0,
                path_count INTEGER NOT NULL DEFAULT 0,
                branch_count INTEGER NOT NULL DEFAULT 0,
                end_count INTEGER NOT NULL DEFAULT 0,
                UNIQUE (tracing_id, brain_area_id)
            )
            "#,
            table = version.search_content_table()
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_neuron ON {table}(neuron_id)",
            table = version.search_content_table()
        ));
    }

    statements
}
