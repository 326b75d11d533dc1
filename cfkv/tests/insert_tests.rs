use cfkv::paths::{ATOMIC_NUMBERS, CELL, PBC, POSITIONS, property_field};
use cfkv::{
    ConfigurationDoc, Error, GroupState, InsertOptions, NdArray, PropertyDoc, PropertySettingsDoc,
};
use cfkv_test_utils::fixtures::build_n;

mod common;
use common::{Harness, flat_f64, setup_default_property, shift_energies};

fn stacked(h: &Harness, path: &str) -> NdArray {
    h.db.get_data(path, None, true)
        .unwrap()
        .into_stacked()
        .expect("stacked")
}

#[test]
fn add_then_update_nochange_config() {
    let h = Harness::new();
    let fx = build_n(10, 1);

    let first = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    let second = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().all(|(_, p)| p.is_none()));
    assert_eq!(h.db.configuration_ids().unwrap().len(), 10);

    let zs: Vec<i64> = fx
        .structures
        .iter()
        .flat_map(|s| s.atomic_numbers.iter().map(|&z| i64::from(z)))
        .collect();
    assert_eq!(stacked(&h, ATOMIC_NUMBERS).as_i64().unwrap(), &zs[..]);

    let positions: Vec<f64> = fx
        .structures
        .iter()
        .flat_map(|s| s.positions.iter().flatten().copied())
        .collect();
    let pos = stacked(&h, POSITIONS);
    assert_eq!(pos.shape(), &[55, 3]);
    assert_eq!(pos.as_f64().unwrap(), &positions[..]);

    assert_eq!(stacked(&h, CELL).shape(), &[30, 3]);
    let pbc = stacked(&h, PBC);
    assert_eq!(pbc.shape(), &[30]);
    assert_eq!(pbc.to_bool_vec().unwrap(), vec![false; 30]);
}

#[test]
fn add_then_update_with_changes_config() {
    let h = Harness::new();
    let mut fx = build_n(10, 2);
    for s in &mut fx.structures {
        s.names.insert("change".into());
        s.labels.insert("another_label".into());
    }
    let first = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();

    for s in &mut fx.structures {
        s.names.insert("change2".into());
        s.labels.insert("another_label2".into());
    }
    let second = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    assert_eq!(first, second);

    for (cid, _) in &second {
        let doc: ConfigurationDoc = h.db.metadata().require(cid).unwrap();
        assert_eq!(
            doc.names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["change", "change2"]
        );
        assert_eq!(
            doc.labels.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["another_label", "another_label2"]
        );
    }
    // Numeric fields are stored once.
    assert_eq!(
        h.db.arrays().group_state(POSITIONS),
        Some(GroupState::Uncollapsed { records: 10 })
    );
}

#[test]
fn add_then_update_with_properties_with_change() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let mut fx = build_n(10, 3);

    let mut pids = Vec::new();
    let mut expected = Vec::new();
    for _ in 0..3 {
        expected.extend(
            fx.structures
                .iter()
                .map(|s| s.info["energy"].as_f64().unwrap()[0]),
        );
        let ids = h.db.insert_data(&fx.structures, &options).unwrap();
        pids.extend(ids.into_iter().map(|(_, p)| p.unwrap()));
        shift_energies(&mut fx.structures, 100000.0);
    }
    assert_eq!(pids.len(), 30);
    assert_eq!(h.db.configuration_ids().unwrap().len(), 10);

    let energy = h
        .db
        .get_property_data("default", "energy", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(energy.as_f64().unwrap(), &expected[..]);
    assert_eq!(&expected[..10], &fx.energies[..]);

    let stress = h
        .db
        .get_property_data("default", "stress", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(stress.shape(), &[180]);
    assert_eq!(stress.as_f64().unwrap(), &flat_f64(fx.stress.iter().cycle().take(30))[..]);

    let names = h
        .db
        .get_property_data("default", "name", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    let expected_names: Vec<String> = fx.names.iter().cycle().take(30).cloned().collect();
    assert_eq!(names.to_string_vec().unwrap(), expected_names);

    let same = h
        .db
        .get_property_data("default", "nd-same-shape", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(same.shape(), &[60, 3, 5]);
    assert_eq!(
        same.as_f64().unwrap(),
        &flat_f64(fx.nd_same_shape.iter().cycle().take(30))[..]
    );

    let forces = h
        .db
        .get_property_data("default", "forces", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(forces.shape(), &[165, 3]);
    assert_eq!(
        forces.as_f64().unwrap(),
        &flat_f64(fx.forces.iter().cycle().take(30))[..]
    );

    let same_arr = h
        .db
        .get_property_data("default", "nd-same-shape-arr", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(same_arr.shape(), &[165, 2, 3]);

    // Ragged fields stay addressable per record.
    for field in ["nd-diff-shapes", "nd-diff-shapes-arr"] {
        let err = h
            .db
            .get_property_data("default", field, None, true)
            .unwrap_err();
        assert!(err.is_concatenation(), "{field}: {err}");
    }
    let diff = h
        .db
        .get_property_data("default", "nd-diff-shapes", None, false)
        .unwrap()
        .into_records()
        .unwrap();
    assert_eq!(diff.len(), 30);
    for ((key, value), expected) in diff.iter().zip(fx.nd_diff_shapes.iter().cycle()) {
        assert_eq!(value, expected);
        assert!(pids.iter().any(|p| p.raw() == *key));
    }
    let diff_arr = h
        .db
        .get_property_data("default", "nd-diff-shapes-arr", None, false)
        .unwrap()
        .into_records()
        .unwrap();
    for ((_, value), expected) in diff_arr.iter().zip(fx.nd_diff_shapes_arr.iter().cycle()) {
        assert_eq!(value, expected);
    }
}

#[test]
fn add_then_update_with_properties_nochange() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let fx = build_n(10, 4);

    let first = h.db.insert_data(&fx.structures, &options).unwrap();
    let second = h.db.insert_data(&fx.structures, &options).unwrap();
    assert_eq!(first, second);

    let energy = h
        .db
        .get_property_data("default", "energy", None, true)
        .unwrap()
        .into_stacked()
        .unwrap();
    assert_eq!(energy.as_f64().unwrap(), &fx.energies[..]);
    assert_eq!(
        h.db
            .arrays()
            .group_state(&property_field("default", "forces")),
        Some(GroupState::Uncollapsed { records: 10 })
    );
}

#[test]
fn insert_links_configurations_properties_and_settings() {
    let h = Harness::new();
    let (pso, options) = setup_default_property(&h.db);
    let mut fx = build_n(10, 5);
    for (i, s) in fx.structures.iter_mut().enumerate() {
        s.names.insert(format!("config_{i}"));
        s.labels.insert("a_label".into());
    }

    let ids = h.db.insert_data(&fx.structures, &options).unwrap();
    let pso_doc: PropertySettingsDoc = h.db.metadata().require(pso).unwrap();

    for (i, ((cid, pid), s)) in ids.iter().zip(&fx.structures).enumerate() {
        let pid = pid.unwrap();
        let config: ConfigurationDoc = h.db.metadata().require(cid).unwrap();
        let prop: PropertyDoc = h.db.metadata().require(pid).unwrap();

        let natoms = h
            .db
            .get_property_data("default", "forces", Some(&[pid][..]), true)
            .unwrap()
            .into_stacked()
            .unwrap()
            .shape()[0];
        assert_eq!(natoms, s.natoms());

        let summary = &config.summary;
        assert_eq!(summary.nsites, s.natoms() as u64);
        assert_eq!(summary.chemical_formula_anonymous, "A");
        assert_eq!(summary.chemical_formula_reduced, "H");
        let hill = if i == 0 { "H".to_string() } else { format!("H{}", i + 1) };
        assert_eq!(summary.chemical_formula_hill, hill);
        assert_eq!(summary.dimension_types, [0, 0, 0]);
        assert_eq!(summary.elements, vec!["H"]);
        assert_eq!(summary.elements_ratios, vec![1.0]);
        assert_eq!(summary.nelements, 1);
        assert_eq!(summary.nperiodic_dimensions, 0);
        assert_eq!(summary.lattice_vectors, s.cell);
        assert!(config.labels.contains("a_label"));
        assert_eq!(
            config.names.iter().collect::<Vec<_>>(),
            vec![&format!("config_{i}")]
        );

        assert!(config.relationships.properties.contains(&pid));
        assert!(prop.relationships.configurations.contains(cid));
        assert!(prop.relationships.property_settings.contains(&pso));
        assert!(pso_doc.relationships.properties.contains(&pid));
        assert_eq!(prop.definition, "default");
        assert!(prop.labels.contains("pso_label1") && prop.labels.contains("pso_label2"));
    }
}

#[test]
fn same_property_on_two_configurations_is_linked_to_both() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let fx = build_n(2, 6);
    // A structurally different twin carrying identical property attributes.
    let mut twin = fx.structures[1].clone();
    twin.positions[0][0] += 1.0;

    let ids = h
        .db
        .insert_data(&[fx.structures[1].clone(), twin], &options)
        .unwrap();
    assert_ne!(ids[0].0, ids[1].0);
    assert_eq!(ids[0].1, ids[1].1);

    let pid = ids[0].1.unwrap();
    let prop: PropertyDoc = h.db.metadata().require(pid).unwrap();
    assert_eq!(prop.relationships.configurations.len(), 2);
    assert_eq!(
        h.db.arrays()
            .group_state(&property_field("default", "energy")),
        Some(GroupState::Uncollapsed { records: 1 })
    );
}

#[test]
fn eager_insert_is_all_or_nothing() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let mut fx = build_n(10, 7);
    fx.structures[4]
        .info
        .insert("stress".into(), NdArray::from_f64(vec![7], vec![0.0; 7]).unwrap());

    let err = h.db.insert_data(&fx.structures, &options).unwrap_err();
    match &err {
        Error::Record { index, source } => {
            assert_eq!(*index, 4);
            assert!(matches!(**source, Error::ShapeMismatch { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_validation());
    assert!(h.db.configuration_ids().unwrap().is_empty());
    assert!(h.db.metadata().keys::<ConfigurationDoc>().unwrap().is_empty());
    assert!(h.db.metadata().keys::<PropertyDoc>().unwrap().is_empty());
}

#[test]
fn lazy_insert_commits_the_prefix() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let mut fx = build_n(10, 8);
    fx.structures[4].info.remove("energy");

    // Collecting into a Result stops at the first failure.
    let stopped: Result<Vec<_>, _> = h
        .db
        .insert_data_lazy(&fx.structures, options.clone())
        .unwrap()
        .collect();
    let err = stopped.unwrap_err();
    assert!(matches!(err.root(), Error::MissingField { field, .. } if field == "energy"));
    assert_eq!(h.db.configuration_ids().unwrap().len(), 4);

    // Consuming past the failure carries on with later records.
    let results: Vec<_> = h
        .db
        .insert_data_lazy(fx.structures.iter(), options)
        .unwrap()
        .collect();
    assert_eq!(results.len(), 10);
    for (i, r) in results.iter().enumerate() {
        if i == 4 {
            assert!(matches!(r, Err(Error::Record { index: 4, .. })));
        } else {
            assert!(r.as_ref().unwrap().1.is_some());
        }
    }
    assert_eq!(h.db.configuration_ids().unwrap().len(), 9);
}

#[test]
fn settings_must_exist_and_be_mapped() {
    let h = Harness::new();
    let (pso, _) = setup_default_property(&h.db);
    let fx = build_n(1, 9);

    let unmapped = InsertOptions::new().with_settings("default", pso);
    assert!(matches!(
        h.db.insert_data(&fx.structures, &unmapped),
        Err(Error::InvalidArgumentError(_))
    ));

    let unknown = InsertOptions::new()
        .with_property("default", common::default_field_map())
        .with_settings("default", cfkv::PropertySettingsId(12345));
    assert!(matches!(
        h.db.insert_data_lazy(&fx.structures, unknown),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn unknown_definition_is_a_schema_error() {
    let h = Harness::new();
    let fx = build_n(1, 10);
    let options = InsertOptions::new().with_property("missing", common::default_field_map());
    let err = h.db.insert_data(&fx.structures, &options).unwrap_err();
    assert!(matches!(err.root(), Error::Schema(_)));
}

#[test]
fn settings_reinsert_unions_labels() {
    let h = Harness::new();
    let first = h.db.insert_property_settings(&common::vasp_settings()).unwrap();
    let again = h
        .db
        .insert_property_settings(&common::vasp_settings().with_label("extra"))
        .unwrap();
    assert_eq!(first, again);
    let doc: PropertySettingsDoc = h.db.metadata().require(first).unwrap();
    assert_eq!(doc.labels.len(), 3);
    assert_eq!(doc.files[0].name, "dummy_name");
}
