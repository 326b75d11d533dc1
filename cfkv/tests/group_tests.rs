use cfkv::{
    ConfigurationDoc, ConfigurationId, ConfigurationSetDoc, DatasetDoc, Error, InsertOptions,
    NewDataset, PropertyDoc,
};
use cfkv_test_utils::fixtures::build_n;
use std::collections::BTreeSet;

mod common;
use common::{Harness, setup_default_property, shift_energies};

fn hill_formulas(n: usize) -> BTreeSet<String> {
    (1..=n)
        .map(|i| if i == 1 { "H".to_string() } else { format!("H{i}") })
        .collect()
}

#[test]
fn insert_configuration_set_aggregates_members() {
    let h = Harness::new();
    let mut fx = build_n(10, 31);
    for (i, s) in fx.structures.iter_mut().enumerate() {
        s.names.insert(format!("config_{i}"));
        s.labels.insert("a_label".into());
    }
    let ids = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    let cids: Vec<ConfigurationId> = ids.iter().map(|(c, _)| *c).collect();

    let cs_id = h.db.insert_configuration_set(&cids, "a description").unwrap();
    let cs: ConfigurationSetDoc = h.db.metadata().require(cs_id).unwrap();
    assert_eq!(cs.description, "a description");

    let agg = &cs.aggregated_info;
    assert_eq!(agg.nconfigurations, 10);
    assert_eq!(agg.nsites, 55);
    assert_eq!(agg.nelements, 1);
    assert_eq!(agg.elements, vec!["H"]);
    assert_eq!(agg.individual_elements_ratios, vec![vec![1.0]]);
    assert_eq!(agg.total_elements_ratios, vec![1.0]);
    assert_eq!(agg.labels, vec!["a_label"]);
    assert_eq!(agg.labels_counts, vec![10]);
    assert_eq!(agg.chemical_formula_reduced, vec!["H"]);
    assert_eq!(agg.chemical_formula_anonymous, vec!["A"]);
    assert_eq!(
        agg.chemical_formula_hill.iter().cloned().collect::<BTreeSet<_>>(),
        hill_formulas(10)
    );
    assert_eq!(agg.nperiodic_dimensions, vec![0]);
    assert_eq!(agg.dimension_types, vec![[0, 0, 0]]);

    assert_eq!(cs.relationships.configurations.len(), 10);
    for cid in &cids {
        let doc: ConfigurationDoc = h.db.metadata().require(cid).unwrap();
        assert!(doc.relationships.configuration_sets.contains(&cs_id));
    }

    // Membership, not order, defines the set.
    let reversed: Vec<_> = cids.iter().rev().copied().collect();
    assert_eq!(
        h.db.insert_configuration_set(&reversed, "ignored").unwrap(),
        cs_id
    );
    let cs: ConfigurationSetDoc = h.db.metadata().require(cs_id).unwrap();
    assert_eq!(cs.description, "a description");
}

#[test]
fn configuration_set_requires_known_members() {
    let h = Harness::new();
    assert!(matches!(
        h.db.insert_configuration_set(&[], "empty"),
        Err(Error::InvalidArgumentError(_))
    ));
    assert!(matches!(
        h.db.insert_configuration_set(&[ConfigurationId(3)], "ghost"),
        Err(Error::NotFound)
    ));
}

#[test]
fn insert_dataset_from_two_configuration_sets() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);

    let mut first = build_n(10, 41);
    for (i, s) in first.structures.iter_mut().enumerate() {
        s.names.insert(format!("config_{i}"));
        s.labels.insert("a_label".into());
    }
    let ids1 = h.db.insert_data(&first.structures, &options).unwrap();
    let (co1, pr1): (Vec<_>, Vec<_>) = ids1.into_iter().unzip();
    let cs1 = h.db.insert_configuration_set(&co1, "a description1").unwrap();

    let mut second = build_n(10, 42);
    for (i, s) in second.structures.iter_mut().enumerate() {
        s.names.insert(format!("second_config_{i}"));
        s.labels.insert("a_second_label".into());
    }
    shift_energies(&mut second.structures, 100000.0);
    let ids2 = h.db.insert_data(&second.structures, &options).unwrap();
    let (co2, pr2): (Vec<_>, Vec<_>) = ids2.into_iter().unzip();
    let cs2 = h.db.insert_configuration_set(&co2, "a description2").unwrap();

    let properties: Vec<_> = pr1.into_iter().chain(pr2).map(Option::unwrap).collect();
    let ds_id = h
        .db
        .insert_dataset(
            &NewDataset::new([cs1, cs2], properties.iter().copied())
                .with_author("colabfit")
                .with_link("https://colabfit.org")
                .with_description("an example dataset")
                .with_resync(true),
        )
        .unwrap();

    let ds: DatasetDoc = h.db.metadata().require(ds_id).unwrap();
    assert_eq!(ds.authors, vec!["colabfit"]);
    assert_eq!(ds.links, vec!["https://colabfit.org"]);
    assert_eq!(ds.description, "an example dataset");
    assert_eq!(ds.relationships.configuration_sets.len(), 2);
    assert_eq!(ds.relationships.properties.len(), 20);

    let agg = &ds.aggregated_info;
    assert_eq!(agg.nconfigurations, 20);
    assert_eq!(agg.nsites, 110);
    assert_eq!(agg.nelements, 1);
    assert_eq!(agg.elements, vec!["H"]);
    assert_eq!(agg.individual_elements_ratios, vec![vec![1.0]]);
    assert_eq!(agg.total_elements_ratios, vec![1.0]);
    assert_eq!(agg.configuration_labels, vec!["a_label", "a_second_label"]);
    assert_eq!(agg.configuration_labels_counts, vec![10, 10]);
    assert_eq!(agg.chemical_formula_reduced, vec!["H"]);
    assert_eq!(agg.chemical_formula_anonymous, vec!["A"]);
    assert_eq!(
        agg.chemical_formula_hill.iter().cloned().collect::<BTreeSet<_>>(),
        hill_formulas(10)
    );
    assert_eq!(agg.nperiodic_dimensions, vec![0]);
    assert_eq!(agg.dimension_types, vec![[0, 0, 0]]);
    assert_eq!(agg.nproperties, 20);
    assert_eq!(agg.types, vec!["default"]);
    assert_eq!(agg.types_counts, vec![20]);
    assert_eq!(agg.property_labels, vec!["pso_label1", "pso_label2"]);

    for cs in [cs1, cs2] {
        let doc: ConfigurationSetDoc = h.db.metadata().require(cs).unwrap();
        assert!(doc.relationships.datasets.contains(&ds_id));
    }
    let prop: PropertyDoc = h.db.metadata().require(properties[0]).unwrap();
    assert!(prop.relationships.datasets.contains(&ds_id));

    // Same members in another order: same dataset, created-once fields kept.
    let again = h
        .db
        .insert_dataset(
            &NewDataset::new([cs2, cs1], properties.iter().rev().copied())
                .with_author("someone else"),
        )
        .unwrap();
    assert_eq!(again, ds_id);
    let ds: DatasetDoc = h.db.metadata().require(ds_id).unwrap();
    assert_eq!(ds.authors, vec!["colabfit"]);
}

#[test]
fn aggregates_are_stale_until_resync() {
    let h = Harness::new();
    let fx = build_n(5, 51);
    let ids = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    let cids: Vec<_> = ids.iter().map(|(c, _)| *c).collect();
    let cs = h.db.insert_configuration_set(&cids, "set").unwrap();
    let ds = h.db.insert_dataset(&NewDataset::new([cs], [])).unwrap();

    let before: DatasetDoc = h.db.metadata().require(ds).unwrap();
    assert!(before.aggregated_info.configuration_labels.is_empty());

    assert_eq!(h.db.apply_labels(&cids[..2], &["relabeled"]).unwrap(), 2);
    assert_eq!(h.db.apply_labels(&cids[..2], &["relabeled"]).unwrap(), 0);

    let stale: DatasetDoc = h.db.metadata().require(ds).unwrap();
    assert!(stale.aggregated_info.configuration_labels.is_empty());
    let stale_set: ConfigurationSetDoc = h.db.metadata().require(cs).unwrap();
    assert!(stale_set.aggregated_info.labels.is_empty());

    let fresh = h.db.resync_dataset(ds).unwrap();
    assert_eq!(fresh.configuration_labels, vec!["relabeled"]);
    assert_eq!(fresh.configuration_labels_counts, vec![2]);

    let stored: DatasetDoc = h.db.metadata().require(ds).unwrap();
    assert_eq!(stored.aggregated_info, fresh);
    let set: ConfigurationSetDoc = h.db.metadata().require(cs).unwrap();
    assert_eq!(set.aggregated_info.labels, vec!["relabeled"]);
}

#[test]
fn dataset_without_resync_pools_stored_set_aggregates() {
    let h = Harness::new();
    let fx = build_n(3, 61);
    let ids = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    let cids: Vec<_> = ids.iter().map(|(c, _)| *c).collect();
    let cs = h.db.insert_configuration_set(&cids, "set").unwrap();
    h.db.apply_labels(&cids, &["late"]).unwrap();

    let ds = h.db.insert_dataset(&NewDataset::new([cs], [])).unwrap();
    let doc: DatasetDoc = h.db.metadata().require(ds).unwrap();
    assert!(doc.aggregated_info.configuration_labels.is_empty());

    let synced = h
        .db
        .insert_dataset(&NewDataset::new([cs], []).with_resync(true))
        .unwrap();
    assert_eq!(synced, ds);
    let doc: DatasetDoc = h.db.metadata().require(ds).unwrap();
    assert_eq!(doc.aggregated_info.configuration_labels, vec!["late"]);
}

#[test]
fn resync_of_unknown_group_is_not_found() {
    let h = Harness::new();
    assert!(matches!(
        h.db.resync_configuration_set(cfkv::ConfigurationSetId(1)),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        h.db.resync_dataset(cfkv::DatasetId(1)),
        Err(Error::NotFound)
    ));
}

#[test]
fn injected_hasher_controls_every_id() {
    use cfkv::{ContentIdentity, DatabaseConfig, SmallWidthHasher};
    use std::sync::Arc;

    let cfg = DatabaseConfig::default()
        .with_identity(ContentIdentity::new(Arc::new(SmallWidthHasher::new(20))));
    let h = Harness::with_config(cfg);
    let (pso, options) = setup_default_property(&h.db);
    let fx = build_n(4, 71);
    let ids = h.db.insert_data(&fx.structures, &options).unwrap();
    let cids: Vec<_> = ids.iter().map(|(c, _)| *c).collect();
    let cs = h.db.insert_configuration_set(&cids, "narrow").unwrap();

    let in_range = |v: i64| (0..1 << 20).contains(&v);
    assert!(in_range(pso.raw()));
    assert!(in_range(cs.raw()));
    for (c, p) in &ids {
        assert!(in_range(c.raw()));
        assert!(in_range(p.unwrap().raw()));
    }
}
