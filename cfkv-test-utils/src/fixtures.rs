//! Randomized hydrogen-chain structures with the attribute mix the engine
//! tests exercise.
//!
//! Structure `i` (1-based) has `i` hydrogen atoms and carries:
//! - info: `energy` (scalar), `stress` (`[6]`), `nd-same-shape` (`[2, 3, 5]`),
//!   `nd-diff-shapes` (`[i+a, i+1+b, i+2+c]`, a/b/c random in 1..4)
//! - info `name`: the string `configuration_i` (the structure's name set
//!   stays empty)
//! - arrays: `forces` (`[i, 3]`), `nd-same-shape-arr` (`[i, 2, 3]`),
//!   `nd-diff-shapes-arr` (`[i, i+a, i+1+b]`)

use cfkv_types::{AtomicStructure, NdArray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Fixture {
    pub structures: Vec<AtomicStructure>,
    pub energies: Vec<f64>,
    pub stress: Vec<NdArray>,
    pub names: Vec<String>,
    pub nd_same_shape: Vec<NdArray>,
    pub nd_diff_shapes: Vec<NdArray>,
    pub forces: Vec<NdArray>,
    pub nd_same_shape_arr: Vec<NdArray>,
    pub nd_diff_shapes_arr: Vec<NdArray>,
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A float array of `shape` filled from `rng`.
pub fn random_nd(rng: &mut StdRng, shape: Vec<usize>) -> NdArray {
    let n: usize = shape.iter().product();
    let values = (0..n).map(|_| rng.random::<f64>()).collect();
    NdArray::from_f64(shape, values).expect("shape matches element count")
}

/// `natoms` hydrogens at random positions, non-periodic.
pub fn hydrogen_chain(rng: &mut StdRng, natoms: usize) -> AtomicStructure {
    let positions = (0..natoms)
        .map(|_| [rng.random(), rng.random(), rng.random()])
        .collect();
    AtomicStructure::new(vec![1; natoms], positions, [[0.0; 3]; 3], [false; 3])
        .expect("valid hydrogen chain")
}

pub fn build_n(n: usize, seed: u64) -> Fixture {
    let mut rng = rng(seed);
    let mut fx = Fixture {
        structures: Vec::with_capacity(n),
        energies: Vec::with_capacity(n),
        stress: Vec::with_capacity(n),
        names: Vec::with_capacity(n),
        nd_same_shape: Vec::with_capacity(n),
        nd_diff_shapes: Vec::with_capacity(n),
        forces: Vec::with_capacity(n),
        nd_same_shape_arr: Vec::with_capacity(n),
        nd_diff_shapes_arr: Vec::with_capacity(n),
    };

    for i in 1..=n {
        let energy: f64 = rng.random();
        let stress = random_nd(&mut rng, vec![6]);
        let name = format!("configuration_{i}");
        let same = random_nd(&mut rng, vec![2, 3, 5]);
        let diff = {
            let a = rng.random_range(1..4);
            let b = rng.random_range(1..4);
            let c = rng.random_range(1..4);
            random_nd(&mut rng, vec![i + a, i + 1 + b, i + 2 + c])
        };
        let forces = random_nd(&mut rng, vec![i, 3]);
        let same_arr = random_nd(&mut rng, vec![i, 2, 3]);
        let diff_arr = {
            let a = rng.random_range(1..4);
            let b = rng.random_range(1..4);
            random_nd(&mut rng, vec![i, i + a, i + 1 + b])
        };

        let structure = hydrogen_chain(&mut rng, i)
            .with_info("name", NdArray::scalar_str(&name))
            .with_info("energy", NdArray::scalar_f64(energy))
            .with_info("stress", stress.clone())
            .with_info("nd-same-shape", same.clone())
            .with_info("nd-diff-shapes", diff.clone())
            .with_array("forces", forces.clone())
            .and_then(|s| s.with_array("nd-same-shape-arr", same_arr.clone()))
            .and_then(|s| s.with_array("nd-diff-shapes-arr", diff_arr.clone()))
            .expect("per-atom arrays match atom count");

        fx.structures.push(structure);
        fx.energies.push(energy);
        fx.stress.push(stress);
        fx.names.push(name);
        fx.nd_same_shape.push(same);
        fx.nd_diff_shapes.push(diff);
        fx.forces.push(forces);
        fx.nd_same_shape_arr.push(same_arr);
        fx.nd_diff_shapes_arr.push(diff_arr);
    }
    fx
}
