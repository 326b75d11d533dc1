use cfkv::paths::{configuration_array, configuration_info};
use cfkv::{AtomicStructure, ConfigurationDoc, Error, InsertOptions, NdArray, RecordKey};
use cfkv_test_utils::fixtures::build_n;

mod common;
use common::{Harness, flat_f64, setup_default_property};

const UNIFORM: [&str; 6] = [
    "configurations/info/energy",
    "configurations/info/stress",
    "configurations/info/name",
    "configurations/info/nd-same-shape",
    "configurations/arrays/forces",
    "configurations/arrays/nd-same-shape-arr",
];
const RAGGED: [&str; 2] = [
    "configurations/info/nd-diff-shapes",
    "configurations/arrays/nd-diff-shapes-arr",
];

fn stacked(h: &Harness, path: &str) -> NdArray {
    h.db.get_data(path, None, true)
        .unwrap()
        .into_stacked()
        .expect("stacked")
}

fn per_record(h: &Harness, path: &str) -> Vec<(RecordKey, NdArray)> {
    h.db.get_data(path, None, false)
        .unwrap()
        .into_records()
        .unwrap()
}

#[test]
fn attributes_are_stored_under_configuration_paths() {
    let h = Harness::new();
    let fx = build_n(5, 81);
    let ids = h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    let keys: Vec<RecordKey> = ids.iter().map(|(c, _)| c.raw()).collect();

    for path in UNIFORM {
        assert_eq!(h.db.concatenate_group(path).unwrap(), 5, "{path}");
    }
    for path in RAGGED {
        let err = h.db.concatenate_group(path).unwrap_err();
        assert!(matches!(err, Error::Concatenation { .. }), "{path}: {err:?}");
    }

    let energy = stacked(&h, "configurations/info/energy");
    assert_eq!(energy.shape(), &[5]);
    assert_eq!(energy.as_f64().unwrap(), &fx.energies[..]);

    let stress = stacked(&h, "configurations/info/stress");
    assert_eq!(stress.shape(), &[30]);
    assert_eq!(stress.to_f64_vec().unwrap(), flat_f64(&fx.stress));

    let names = stacked(&h, "configurations/info/name");
    assert_eq!(names.to_string_vec().unwrap(), fx.names);

    let same = stacked(&h, "configurations/info/nd-same-shape");
    assert_eq!(same.shape(), &[10, 3, 5]);
    assert_eq!(same.to_f64_vec().unwrap(), flat_f64(&fx.nd_same_shape));

    // 1 + 2 + 3 + 4 + 5 atoms.
    let forces = stacked(&h, "configurations/arrays/forces");
    assert_eq!(forces.shape(), &[15, 3]);
    assert_eq!(forces.to_f64_vec().unwrap(), flat_f64(&fx.forces));

    let same_arr = stacked(&h, "configurations/arrays/nd-same-shape-arr");
    assert_eq!(same_arr.shape(), &[15, 2, 3]);
    assert_eq!(same_arr.to_f64_vec().unwrap(), flat_f64(&fx.nd_same_shape_arr));

    // Ragged groups stay addressable per configuration.
    for (path, want) in RAGGED.into_iter().zip([&fx.nd_diff_shapes, &fx.nd_diff_shapes_arr]) {
        let got = per_record(&h, path);
        assert_eq!(got.len(), 5);
        for ((id, v), (want_id, w)) in got.iter().zip(keys.iter().zip(want)) {
            assert_eq!(id, want_id);
            assert_eq!(v, w);
        }
        assert!(h.db.get_data(path, None, true).unwrap_err().is_concatenation());
    }
}

#[test]
fn configurations_roundtrip_with_attributes() {
    let h = Harness::new();
    let fx = build_n(4, 82);
    h.db.insert_data(&fx.structures, &InsertOptions::default()).unwrap();
    // Reads must not depend on group state.
    h.db.concatenate_group("configurations/arrays/forces").unwrap();

    let all = h.db.get_configurations(None).unwrap();
    assert_eq!(all, fx.structures);
    let lazy: Vec<AtomicStructure> = h
        .db
        .iter_configurations(None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lazy, fx.structures);

    let reopened = h.reopen();
    assert_eq!(reopened.get_configurations(None).unwrap(), fx.structures);
}

#[test]
fn reinsert_adds_new_attribute_keys_and_keeps_stored_values() {
    let h = Harness::new();
    let base = AtomicStructure::from_symbols(&["H", "H"], vec![[0.0; 3], [0.0, 0.0, 0.74]])
        .unwrap()
        .with_info("energy", NdArray::scalar_f64(-1.0));
    let ids = h.db.insert_data(&[base.clone()], &InsertOptions::default()).unwrap();
    let cid = ids[0].0;

    let forces = NdArray::from_f64(vec![2, 3], vec![0.25; 6]).unwrap();
    let again = base
        .clone()
        .with_info("energy", NdArray::scalar_f64(-2.0))
        .with_array("forces", forces.clone())
        .unwrap();
    assert_eq!(
        h.db.insert_data(&[again], &InsertOptions::default()).unwrap(),
        ids
    );

    let got = h.db.get_configuration(cid).unwrap();
    assert_eq!(got.info["energy"], NdArray::scalar_f64(-1.0));
    assert_eq!(got.arrays["forces"], forces);

    let doc: ConfigurationDoc = h.db.metadata().require(cid).unwrap();
    assert!(doc.attributes.info.contains("energy"));
    assert!(doc.attributes.arrays.contains("forces"));
    assert_eq!(
        h.db.arrays().record_ids(&configuration_info("energy")).unwrap(),
        vec![cid.raw()]
    );
    assert!(h.db.arrays().contains(&configuration_array("forces"), cid.raw()));
}

#[test]
fn attributes_cannot_shadow_identity_fields() {
    let h = Harness::new();
    let cell = NdArray::from_f64(vec![3, 3], vec![1.0; 9]).unwrap();
    let clash = AtomicStructure::from_symbols(&["H"], vec![[0.0; 3]])
        .unwrap()
        .with_info("cell", cell);
    let err = h
        .db
        .insert_data(&[clash], &InsertOptions::default())
        .unwrap_err();
    assert!(matches!(err.root(), Error::InvalidArgumentError(_)));
    assert!(h.db.configuration_ids().unwrap().is_empty());
}

#[test]
fn property_sources_are_also_kept_on_the_configuration() {
    let h = Harness::new();
    let (_, options) = setup_default_property(&h.db);
    let fx = build_n(3, 83);
    let ids = h.db.insert_data(&fx.structures, &options).unwrap();

    let pids: Vec<_> = ids.iter().map(|(_, p)| p.unwrap()).collect();
    let from_property = h
        .db
        .get_property_data("default", "energy", Some(&pids[..]), true)
        .unwrap()
        .into_stacked()
        .unwrap();
    let from_configuration = stacked(&h, "configurations/info/energy");
    assert_eq!(from_property.as_f64(), from_configuration.as_f64());
}
