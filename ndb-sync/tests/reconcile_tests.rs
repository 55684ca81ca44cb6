//! End-to-end reconciliation tests against file-backed stores

mod helpers;

use helpers::*;
use ndb_common::{AtlasVersion, SearchScope, Sharing, Visibility};
use ndb_sync::models::CompartmentContent;
use uuid::Uuid;

fn row_in(rows: &[CompartmentContent], region: Uuid) -> Option<&CompartmentContent> {
    rows.iter().find(|row| row.brain_area_id == region)
}

fn totals(rows: &[CompartmentContent]) -> (i64, i64) {
    (
        rows.iter().map(|row| row.node_count).sum(),
        rows.iter().map(|row| row.soma_count).sum(),
    )
}

async fn soma_node_regions(ts: &TestStores, node: Uuid) -> (Option<String>, Option<String>) {
    sqlx::query_as::<_, (Option<String>, Option<String>)>(
        "SELECT brain_area_id_ccf_v25, brain_area_id_ccf_v30 FROM tracing_node WHERE id = ?",
    )
    .bind(node.to_string())
    .fetch_one(ts.search())
    .await
    .unwrap()
}

/// One public sample, one public neuron, one 5-node tracing with its soma in cortex
async fn single_neuron_fixture(region: Option<Uuid>, metadata: Option<&str>) -> (TestStores, Catalog, Uuid, TracingIds) {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (_, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllExternal, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, region, metadata, t(0))
        .await
        .unwrap();
    let ids = catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(5, catalog.cortex, catalog.grey))
        .await
        .unwrap();
    (ts, catalog, neuron, ids)
}

#[tokio::test]
async fn test_first_sync_populates_search_store() {
    let (ts, catalog, neuron, ids) = single_neuron_fixture(None, None).await;

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    assert_eq!(stats.reference.upserted, 8);
    assert_eq!(stats.samples_written, 1);
    assert_eq!(stats.neurons_written, 1);
    assert_eq!(stats.tracings_written, 1);
    assert_eq!(stats.nodes_copied, 5);
    assert_eq!(stats.soma_links_set, 1);
    assert_eq!(stats.integrity_warnings, 0);

    let search = ts.search();
    assert_eq!(count_rows(search, "brain_area").await, 4);
    assert_eq!(count_rows(search, "structure_identifier").await, 2);
    assert_eq!(count_rows(search, "tracing_node").await, 5);

    let row = search_neuron(search, neuron).await.unwrap();
    assert_eq!(row.search_scope, SearchScope::Public);
    assert_eq!(row.brain_area_id, Some(catalog.cortex));

    let tracing = search_tracing(search, ids.registered).await.unwrap();
    assert_eq!(tracing.soma_id, Some(ids.soma_node));
    assert_eq!(tracing.neuron_id, neuron);
    assert_eq!(tracing.swc_tracing_id, Some(ids.raw));
    assert_eq!(tracing.updated_at, t(0));

    for version in AtlasVersion::ALL {
        let rows = content_rows(search, version, ids.registered).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(totals(&rows), (5, 1));
        let soma_row = row_in(&rows, catalog.cortex).unwrap();
        assert_eq!(soma_row.soma_count, 1);
        assert_eq!(soma_row.soma_x, 10.0);
        assert_eq!(soma_row.search_scope, SearchScope::Public);
    }
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let (ts, _catalog, _neuron, ids) = single_neuron_fixture(None, None).await;
    let reconciler = ts.reconciler(test_options(Visibility::ShareAllExternal));

    reconciler.try_run().await.unwrap();
    let mut snapshot = Vec::new();
    for version in AtlasVersion::ALL {
        snapshot.push(content_rows(ts.search(), version, ids.registered).await);
    }

    let stats = reconciler.try_run().await.unwrap();
    assert_eq!(stats.rows_written(), 0);
    assert_eq!(stats.rows_removed(), 0);
    assert_eq!(stats.reference.upserted, 0);
    assert_eq!(stats.samples_reused, 1);
    assert_eq!(stats.neurons_reused, 1);
    assert_eq!(stats.tracings_reused, 1);

    for (version, rows) in AtlasVersion::ALL.into_iter().zip(snapshot) {
        assert_eq!(content_rows(ts.search(), version, ids.registered).await, rows);
    }
}

#[tokio::test]
async fn test_force_update_rewrites_same_rows() {
    let (ts, _catalog, _neuron, ids) = single_neuron_fixture(None, None).await;
    let first = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    let mut options = test_options(Visibility::ShareAllExternal);
    options.force_update = true;
    let forced = ts.reconciler(options).try_run().await.unwrap();

    assert_eq!(forced.samples_written, first.samples_written);
    assert_eq!(forced.neurons_written, first.neurons_written);
    assert_eq!(forced.tracings_written, first.tracings_written);
    assert_eq!(forced.nodes_copied, first.nodes_copied);
    assert_eq!(forced.content_ccf_v30.rows_inserted, first.content_ccf_v30.rows_inserted);
    assert_eq!(count_rows(ts.search(), "tracing_node").await, 5);
    assert_eq!(
        search_tracing(ts.search(), ids.registered).await.unwrap().soma_id,
        Some(ids.soma_node)
    );
}

#[tokio::test]
async fn test_inherited_neuron_follows_sample_sharing() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (sample, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllInternal, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::Inherited, Some(catalog.cortex), None, t(0))
        .await
        .unwrap();
    catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(3, catalog.cortex, catalog.cortex))
        .await
        .unwrap();

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(stats.samples_written, 0);
    assert_eq!(stats.neurons_written, 0);
    assert_eq!(count_rows(ts.search(), "neuron").await, 0);

    ts.reconciler(test_options(Visibility::ShareAllInternal))
        .try_run()
        .await
        .unwrap();
    let row = search_neuron(ts.search(), neuron).await.unwrap();
    assert_eq!(row.search_scope, SearchScope::Internal);
    assert_eq!(row.sample_id, sample);
}

#[tokio::test]
async fn test_private_sample_is_kept_for_public_neuron() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (sample, injection) = catalog
        .insert_sample(&ts.stores, Sharing::DoNotShare, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, Some(catalog.cortex), None, t(0))
        .await
        .unwrap();
    catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(3, catalog.cortex, catalog.grey))
        .await
        .unwrap();

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(stats.samples_written, 1);

    let scope: i64 = sqlx::query_scalar("SELECT search_scope FROM sample WHERE id = ?")
        .bind(sample.to_string())
        .fetch_one(ts.search())
        .await
        .unwrap();
    assert_eq!(SearchScope::from_code(scope), SearchScope::Team);
    assert_eq!(
        search_neuron(ts.search(), neuron).await.unwrap().search_scope,
        SearchScope::Public
    );
}

#[tokio::test]
async fn test_explicit_region_absorbs_soma_into_existing_row() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (_, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllExternal, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, Some(catalog.thalamus), None, t(0))
        .await
        .unwrap();
    let ids = catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(6, catalog.cortex, catalog.thalamus))
        .await
        .unwrap();

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(stats.content_ccf_v25.reallocations, 1);
    assert_eq!(stats.content_ccf_v30.reallocations, 1);
    assert_eq!(stats.soma_regions_patched, 1);

    for version in AtlasVersion::ALL {
        let rows = content_rows(ts.search(), version, ids.registered).await;
        assert_eq!(totals(&rows), (6, 1));
        let target = row_in(&rows, catalog.thalamus).unwrap();
        assert_eq!((target.node_count, target.soma_count), (6, 1));
        let released = row_in(&rows, catalog.cortex).unwrap();
        assert_eq!((released.node_count, released.soma_count), (0, 0));
    }

    let thalamus = Some(catalog.thalamus.to_string());
    assert_eq!(soma_node_regions(&ts, ids.soma_node).await, (thalamus.clone(), thalamus));

    let again = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(again.rows_written(), 0);
}

#[tokio::test]
async fn test_explicit_region_creates_missing_target_row() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (_, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllExternal, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, Some(catalog.thalamus), None, t(0))
        .await
        .unwrap();
    let ids = catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(4, catalog.cortex, catalog.grey))
        .await
        .unwrap();

    ts.reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    for version in AtlasVersion::ALL {
        let rows = content_rows(ts.search(), version, ids.registered).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(totals(&rows), (4, 1));

        let created = row_in(&rows, catalog.thalamus).unwrap();
        assert_eq!((created.node_count, created.soma_count), (1, 1));
        assert_eq!((created.path_count, created.branch_count, created.end_count), (0, 0, 0));
        assert_eq!(created.neuron_id, neuron);
        assert_eq!(created.soma_x, 10.0);

        let arbor = row_in(&rows, catalog.grey).unwrap();
        assert_eq!((arbor.node_count, arbor.soma_count), (3, 0));
    }
}

#[tokio::test]
async fn test_soma_region_falls_back_to_older_atlas() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (_, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllExternal, t(0))
        .await
        .unwrap();

    let older_only = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, None, None, t(0))
        .await
        .unwrap();
    let mut spec = TracingSpec::new(3, catalog.cortex, catalog.grey);
    spec.soma_v30 = None;
    catalog.insert_tracing(&ts.stores, older_only, spec).await.unwrap();

    let both = catalog
        .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, None, None, t(0))
        .await
        .unwrap();
    let mut spec = TracingSpec::new(3, catalog.cortex, catalog.grey);
    spec.soma_v30 = Some(catalog.thalamus);
    catalog.insert_tracing(&ts.stores, both, spec).await.unwrap();

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(stats.integrity_warnings, 0);

    assert_eq!(
        search_neuron(ts.search(), older_only).await.unwrap().brain_area_id,
        Some(catalog.cortex)
    );
    assert_eq!(
        search_neuron(ts.search(), both).await.unwrap().brain_area_id,
        Some(catalog.thalamus)
    );
}

#[tokio::test]
async fn test_annotation_overrides_reach_content_rows() {
    let metadata = r#"{"manualAnnotations":{"curatedCompartmentId":549,"legacyCompartmentIds":[8,123456]}}"#;
    let (ts, catalog, neuron, ids) = single_neuron_fixture(None, Some(metadata)).await;

    ts.reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    let row = search_neuron(ts.search(), neuron).await.unwrap();
    assert_eq!(row.manual_soma_compartment_id, Some(catalog.thalamus));
    let legacy: Vec<Uuid> = serde_json::from_str(row.legacy_soma_ids.as_deref().unwrap()).unwrap();
    assert_eq!(legacy, vec![catalog.grey]);

    let contents = content_rows(ts.search(), AtlasVersion::CcfV30, ids.registered).await;
    assert!(contents
        .iter()
        .all(|c| c.manual_soma_compartment_id == Some(catalog.thalamus)));
}

#[tokio::test]
async fn test_unreadable_metadata_is_a_warning() {
    let (ts, _catalog, neuron, _ids) = single_neuron_fixture(None, Some("{not json")).await;

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    assert_eq!(stats.integrity_warnings, 1);
    let row = search_neuron(ts.search(), neuron).await.unwrap();
    assert_eq!(row.manual_soma_compartment_id, None);
    assert_eq!(row.legacy_soma_ids, None);
}

#[tokio::test]
async fn test_tracing_without_raw_tracing_is_skipped() {
    let (ts, _catalog, _neuron, _ids) = single_neuron_fixture(None, None).await;
    let orphan = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tracing (id, swc_tracing_id, node_count, updated_at) VALUES (?, ?, 0, '2024-01-01T00:00:00Z')",
    )
    .bind(orphan.to_string())
    .bind(Uuid::new_v4().to_string())
    .execute(&ts.stores.registered_tracing)
    .await
    .unwrap();

    let stats = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    assert_eq!(stats.integrity_warnings, 1);
    assert_eq!(stats.tracings_written, 1);
    assert!(search_tracing(ts.search(), orphan).await.is_none());
}

#[tokio::test]
async fn test_dropped_visibility_removes_neuron_tree() {
    let (ts, catalog, neuron, ids) = single_neuron_fixture(None, None).await;
    let reconciler = ts.reconciler(test_options(Visibility::ShareAllExternal));
    reconciler.try_run().await.unwrap();

    catalog
        .set_neuron_sharing(&ts.stores, neuron, Sharing::DoNotShare, t(5))
        .await
        .unwrap();
    let stats = reconciler.try_run().await.unwrap();

    assert_eq!(stats.neurons_removed, 1);
    assert_eq!(stats.tracings_removed, 1);
    assert_eq!(stats.nodes_removed, 5);
    assert_eq!(stats.content_rows_removed, 4);
    assert!(search_neuron(ts.search(), neuron).await.is_none());
    assert!(search_tracing(ts.search(), ids.registered).await.is_none());
    assert_eq!(count_rows(ts.search(), "tracing_node").await, 0);
    assert_eq!(count_rows(ts.search(), "ccf_v25_search_content").await, 0);

    // the sample qualifies on its own
    assert_eq!(count_rows(ts.search(), "sample").await, 1);
    assert_eq!(stats.samples_unqualified, 0);
}

#[tokio::test]
async fn test_unqualified_samples_are_pruned_only_when_enabled() {
    let (ts, catalog, neuron, _ids) = single_neuron_fixture(None, None).await;
    ts.reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();

    let sample: String = sqlx::query_scalar("SELECT id FROM sample")
        .fetch_one(ts.search())
        .await
        .unwrap();
    let sample = Uuid::parse_str(&sample).unwrap();
    catalog
        .set_sample_sharing(&ts.stores, sample, Sharing::DoNotShare, t(5))
        .await
        .unwrap();
    catalog
        .set_neuron_sharing(&ts.stores, neuron, Sharing::DoNotShare, t(5))
        .await
        .unwrap();

    let kept = ts
        .reconciler(test_options(Visibility::ShareAllExternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(kept.samples_unqualified, 1);
    assert_eq!(kept.samples_removed, 0);
    assert_eq!(count_rows(ts.search(), "sample").await, 1);

    let mut options = test_options(Visibility::ShareAllExternal);
    options.prune_samples = true;
    let pruned = ts.reconciler(options).try_run().await.unwrap();
    assert_eq!(pruned.samples_removed, 1);
    assert_eq!(count_rows(ts.search(), "sample").await, 0);
}

#[tokio::test]
async fn test_many_tracings_across_chunks() {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (_, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllExternal, t(0))
        .await
        .unwrap();

    let mut registered = Vec::new();
    for n in 0..3 {
        let neuron = catalog
            .insert_neuron(&ts.stores, injection, Sharing::ShareAllExternal, None, None, t(n))
            .await
            .unwrap();
        for _ in 0..3 {
            let ids = catalog
                .insert_tracing(&ts.stores, neuron, TracingSpec::new(4, catalog.cortex, catalog.grey))
                .await
                .unwrap();
            registered.push(ids);
        }
    }

    let mut options = test_options(Visibility::ShareAllExternal);
    options.tracing_chunk_count = 4;
    let stats = ts.reconciler(options).try_run().await.unwrap();

    assert_eq!(stats.tracings_written, 9);
    assert_eq!(stats.nodes_copied, 36);
    assert_eq!(stats.soma_links_set, 9);
    assert_eq!(count_rows(ts.search(), "tracing_node").await, 36);
    for ids in registered {
        let tracing = search_tracing(ts.search(), ids.registered).await.unwrap();
        assert_eq!(tracing.soma_id, Some(ids.soma_node));
        assert!(tracing.updated_at >= t(0));
    }
}

#[tokio::test]
async fn test_upstream_tracing_change_rewrites_nodes() {
    let (ts, catalog, _neuron, ids) = single_neuron_fixture(None, None).await;
    let reconciler = ts.reconciler(test_options(Visibility::ShareAllExternal));
    reconciler.try_run().await.unwrap();

    let mut spec = TracingSpec::new(8, catalog.cortex, catalog.thalamus);
    spec.updated_at = t(30);
    let ids = catalog
        .replace_tracing_geometry(&ts.stores, ids, spec)
        .await
        .unwrap();

    let stats = reconciler.try_run().await.unwrap();
    assert_eq!(stats.tracings_written, 1);
    assert_eq!(stats.neurons_reused, 1);
    assert_eq!(stats.nodes_copied, 8);
    assert_eq!(count_rows(ts.search(), "tracing_node").await, 8);

    let tracing = search_tracing(ts.search(), ids.registered).await.unwrap();
    assert_eq!(tracing.node_count, 8);
    assert_eq!(tracing.soma_id, Some(ids.soma_node));
    assert_eq!(tracing.updated_at, t(30));

    let rows = content_rows(ts.search(), AtlasVersion::CcfV25, ids.registered).await;
    assert_eq!(totals(&rows), (8, 1));
    assert!(row_in(&rows, catalog.grey).is_none());
}

#[tokio::test]
async fn test_run_reports_failure_on_store_error() {
    let (ts, _catalog, _neuron, _ids) = single_neuron_fixture(None, None).await;
    sqlx::query("DROP TABLE ccf_v30_search_content")
        .execute(ts.search())
        .await
        .unwrap();

    assert!(!ts.reconciler(test_options(Visibility::ShareAllExternal)).run().await);
}

#[tokio::test]
async fn test_content_failure_is_rebuilt_on_next_run() {
    let (ts, catalog, _neuron, ids) = single_neuron_fixture(None, None).await;
    sqlx::query(
        "CREATE TRIGGER block_v30 BEFORE INSERT ON ccf_v30_search_content BEGIN SELECT RAISE(ABORT, 'blocked'); END",
    )
    .execute(ts.search())
    .await
    .unwrap();

    let reconciler = ts.reconciler(test_options(Visibility::ShareAllExternal));
    assert!(!reconciler.run().await);
    assert!(content_rows(ts.search(), AtlasVersion::CcfV30, ids.registered).await.is_empty());
    let pending = search_tracing(ts.search(), ids.registered).await.unwrap();
    assert!(pending.updated_at < t(0));

    sqlx::query("DROP TRIGGER block_v30").execute(ts.search()).await.unwrap();
    let stats = reconciler.try_run().await.unwrap();
    assert_eq!(stats.tracings_written, 1);
    assert_eq!(stats.tracings_completed, 1);

    for version in AtlasVersion::ALL {
        let rows = content_rows(ts.search(), version, ids.registered).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(totals(&rows), (5, 1));
        assert!(row_in(&rows, catalog.cortex).is_some());
    }
    let tracing = search_tracing(ts.search(), ids.registered).await.unwrap();
    assert_eq!(tracing.updated_at, t(0));
    assert_eq!(tracing.soma_id, Some(ids.soma_node));

    let again = reconciler.try_run().await.unwrap();
    assert_eq!(again.rows_written(), 0);
}

/// Inherited neuron under an internal sample, synced at the internal threshold
async fn inherited_fixture() -> (TestStores, Catalog, Uuid, Uuid, TracingIds) {
    let ts = create_test_stores().await.unwrap();
    let catalog = Catalog::seed(&ts.stores).await.unwrap();
    let (sample, injection) = catalog
        .insert_sample(&ts.stores, Sharing::ShareAllInternal, t(0))
        .await
        .unwrap();
    let neuron = catalog
        .insert_neuron(&ts.stores, injection, Sharing::Inherited, None, None, t(0))
        .await
        .unwrap();
    let ids = catalog
        .insert_tracing(&ts.stores, neuron, TracingSpec::new(4, catalog.cortex, catalog.grey))
        .await
        .unwrap();

    ts.reconciler(test_options(Visibility::ShareAllInternal))
        .try_run()
        .await
        .unwrap();
    assert_eq!(
        search_neuron(ts.search(), neuron).await.unwrap().search_scope,
        SearchScope::Internal
    );
    (ts, catalog, sample, neuron, ids)
}

async fn assert_scope_everywhere(ts: &TestStores, neuron: Uuid, ids: TracingIds, scope: SearchScope) {
    assert_eq!(search_neuron(ts.search(), neuron).await.unwrap().search_scope, scope);
    assert_eq!(search_tracing(ts.search(), ids.registered).await.unwrap().search_scope, scope);
    for version in AtlasVersion::ALL {
        let rows = content_rows(ts.search(), version, ids.registered).await;
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|row| row.search_scope == scope));
    }
}

#[tokio::test]
async fn test_sample_sharing_change_reaches_inheriting_neuron_tree() {
    let (ts, catalog, sample, neuron, ids) = inherited_fixture().await;

    catalog
        .set_sample_sharing(&ts.stores, sample, Sharing::ShareAllExternal, t(5))
        .await
        .unwrap();
    let stats = ts
        .reconciler(test_options(Visibility::ShareAllInternal))
        .try_run()
        .await
        .unwrap();

    assert_eq!(stats.samples_written, 1);
    assert_eq!(stats.neurons_written, 1);
    assert_eq!(stats.tracings_written, 1);
    assert_scope_everywhere(&ts, neuron, ids, SearchScope::Public).await;
    assert_eq!(search_neuron(ts.search(), neuron).await.unwrap().updated_at, t(5));

    let upstream_sharing: i64 = sqlx::query_scalar("SELECT sharing FROM neuron WHERE id = ?")
        .bind(neuron.to_string())
        .fetch_one(&ts.stores.sample)
        .await
        .unwrap();
    assert_eq!(upstream_sharing, Sharing::INHERITED);
}

#[tokio::test]
async fn test_sample_sharing_change_survives_failed_run() {
    let (ts, catalog, sample, neuron, ids) = inherited_fixture().await;
    catalog
        .set_sample_sharing(&ts.stores, sample, Sharing::ShareAllExternal, t(5))
        .await
        .unwrap();

    // Fails the tracing rewrite after the sample and neuron rows are written
    sqlx::query(
        "CREATE TRIGGER block_tracing BEFORE UPDATE OF search_scope ON tracing \
         BEGIN SELECT RAISE(ABORT, 'blocked'); END",
    )
    .execute(ts.search())
    .await
    .unwrap();

    let reconciler = ts.reconciler(test_options(Visibility::ShareAllInternal));
    assert!(!reconciler.run().await);
    assert_eq!(
        search_neuron(ts.search(), neuron).await.unwrap().search_scope,
        SearchScope::Public
    );

    sqlx::query("DROP TRIGGER block_tracing").execute(ts.search()).await.unwrap();
    let stats = reconciler.try_run().await.unwrap();
    assert_eq!(stats.samples_reused, 1);
    assert_eq!(stats.neurons_reused, 1);
    assert_eq!(stats.tracings_written, 1);

    assert_scope_everywhere(&ts, neuron, ids, SearchScope::Public).await;
    assert_eq!(search_tracing(ts.search(), ids.registered).await.unwrap().updated_at, t(5));
}

#[tokio::test]
async fn test_reference_rows_removed_upstream_are_deleted() {
    let (ts, _catalog, _neuron, _ids) = single_neuron_fixture(None, None).await;
    let retired = Uuid::new_v4();
    sqlx::query("INSERT INTO mouse_strain (id, name, updated_at) VALUES (?, 'BALB/c', '2024-01-01T00:00:00Z')")
        .bind(retired.to_string())
        .execute(&ts.stores.sample)
        .await
        .unwrap();

    let reconciler = ts.reconciler(test_options(Visibility::ShareAllExternal));
    let first = reconciler.try_run().await.unwrap();
    assert_eq!(first.reference.upserted, 9);
    assert_eq!(count_rows(ts.search(), "mouse_strain").await, 2);

    sqlx::query("DELETE FROM mouse_strain WHERE id = ?")
        .bind(retired.to_string())
        .execute(&ts.stores.sample)
        .await
        .unwrap();
    let second = reconciler.try_run().await.unwrap();
    assert_eq!(second.reference.removed, 1);
    assert_eq!(second.reference.upserted, 0);
    assert_eq!(count_rows(ts.search(), "mouse_strain").await, 1);
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mouse_strain WHERE id = ?")
        .bind(retired.to_string())
        .fetch_one(ts.search())
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let third = reconciler.try_run().await.unwrap();
    assert_eq!(third.reference.removed, 0);
    assert_eq!(third.reference.upserted, 0);
    assert_eq!(third.rows_written(), 0);
}
