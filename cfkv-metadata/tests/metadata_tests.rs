use cfkv_aggregate::{ConfigurationSetAccumulator, ConfigurationSummary};
use cfkv_metadata::{
    Collection, ConfigurationDoc, ConfigurationSetDoc, MemDocumentStore, MetadataStore,
    PropertyDoc, WriteBatch, link_configuration_set, link_property,
};
use cfkv_result::Error;
use cfkv_test_utils::fixtures::build_n;
use cfkv_types::{ConfigurationId, ConfigurationSetId, PropertyId};
use std::sync::Arc;
use time::OffsetDateTime;

fn store() -> (Arc<MemDocumentStore>, MetadataStore<MemDocumentStore>) {
    let docs = Arc::new(MemDocumentStore::new());
    (Arc::clone(&docs), MetadataStore::new(docs))
}

#[test]
fn typed_roundtrip_and_missing() {
    cfkv_test_utils::init_tracing_for_tests();
    let (_, meta) = store();
    let fx = build_n(1, 3);
    let summary = ConfigurationSummary::from_structure(&fx.structures[0]).unwrap();
    let mut doc = ConfigurationDoc::new(ConfigurationId(42), summary);
    doc.names.insert("h-chain".into());
    meta.put(&doc).unwrap();

    let back: ConfigurationDoc = meta.require(42).unwrap();
    assert_eq!(back, doc);
    assert!(meta.get::<ConfigurationDoc>(43).unwrap().is_none());
    assert!(matches!(
        meta.require::<ConfigurationDoc>(43),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        meta.require_many::<ConfigurationDoc, _>([42, 43]),
        Err(Error::NotFound)
    ));
}

#[test]
fn both_sides_of_an_edge_commit_together() {
    let (docs, meta) = store();
    let mut c = ConfigurationDoc::new(ConfigurationId(1), ConfigurationSummary::default());
    let mut p = PropertyDoc::new(PropertyId(2), "energy", vec!["energy".into()]);
    link_property(&mut c, &mut p);

    let mut batch = WriteBatch::new();
    batch.upsert(&c).unwrap().upsert(&p).unwrap();
    assert_eq!(docs.len(Collection::Configurations), 0);
    meta.commit(batch).unwrap();

    let c: ConfigurationDoc = meta.require(1).unwrap();
    let p: PropertyDoc = meta.require(2).unwrap();
    assert!(c.relationships.properties.contains(&PropertyId(2)));
    assert!(p.relationships.configurations.contains(&ConfigurationId(1)));
}

#[test]
fn all_returns_insertion_order() {
    let (_, meta) = store();
    for id in [5, -3, 9] {
        meta.put(&ConfigurationDoc::new(
            ConfigurationId(id),
            ConfigurationSummary::default(),
        ))
        .unwrap();
    }
    let ids: Vec<i64> = meta
        .all::<ConfigurationDoc>()
        .unwrap()
        .into_iter()
        .map(|d| d.id.raw())
        .collect();
    assert_eq!(ids, vec![5, -3, 9]);
}

#[test]
fn configuration_set_doc_keeps_aggregate() {
    let (_, meta) = store();
    let fx = build_n(4, 11);
    let mut acc = ConfigurationSetAccumulator::new();
    let mut configs = Vec::new();
    for (i, s) in fx.structures.iter().enumerate() {
        let summary = ConfigurationSummary::from_structure(s).unwrap();
        acc.update(&summary, &s.labels);
        configs.push(ConfigurationDoc::new(ConfigurationId(i as i64), summary));
    }
    let mut set = ConfigurationSetDoc {
        id: ConfigurationSetId(77),
        description: "hydrogen".into(),
        last_modified: OffsetDateTime::now_utc(),
        aggregated_info: acc.finalize(),
        relationships: Default::default(),
    };
    let mut batch = WriteBatch::new();
    for c in &mut configs {
        link_configuration_set(c, &mut set);
        batch.upsert(&*c).unwrap();
    }
    batch.upsert(&set).unwrap();
    meta.commit(batch).unwrap();

    let back: ConfigurationSetDoc = meta.require(77).unwrap();
    assert_eq!(back.aggregated_info.nconfigurations, 4);
    assert_eq!(back.aggregated_info.elements, vec!["H"]);
    assert_eq!(back.relationships.configurations.len(), 4);
    let c0: ConfigurationDoc = meta.require(0).unwrap();
    assert!(
        c0.relationships
            .configuration_sets
            .contains(&ConfigurationSetId(77))
    );
}

#[test]
fn empty_commit_is_skipped() {
    let (docs, meta) = store();
    meta.commit(WriteBatch::new()).unwrap();
    assert_eq!(docs.len(Collection::Properties), 0);
}
