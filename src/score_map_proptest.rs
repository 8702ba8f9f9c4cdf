#![cfg(test)]

// Property tests for ScoreMap kept inside the crate so they can check engine
// accounting alongside the public operations.

use crate::score_map::ScoreMap;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations shrink toward earlier fields and shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Update(usize, u64),
    Skip(usize, u64),
    Erase(usize),
    Find(usize),
    FindRaw(Vec<u8>),
    Clear,
    Iterate,
}

fn arb_bits() -> impl Strategy<Value = u64> {
    prop_oneof![
        any::<u64>(),
        Just(0f64.to_bits()),
        Just((-0f64).to_bits()),
        Just(f64::INFINITY.to_bits()),
        Just(f64::NAN.to_bits() | 0x1234),
    ]
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<OpI>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=8).prop_flat_map(
        |pool| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                4 => (idx.clone(), arb_bits()).prop_map(|(i, b)| OpI::Update(i, b)),
                2 => (idx.clone(), arb_bits()).prop_map(|(i, b)| OpI::Skip(i, b)),
                2 => idx.clone().prop_map(OpI::Erase),
                2 => idx.clone().prop_map(OpI::Find),
                1 => proptest::collection::vec(any::<u8>(), 0..6).prop_map(OpI::FindRaw),
                1 => Just(OpI::Clear),
                1 => Just(OpI::Iterate),
            ];
            proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

// Property: state-machine equivalence against HashMap<Vec<u8>, u64> with
// scores compared as bit patterns.
// - add_or_update: last write wins; `inserted` iff absent before.
// - add_or_skip: existing score kept; `inserted` iff absent before.
// - erase/find parity with the model; clear empties.
// - iter yields exactly the model's pairs.
// - len and obj_malloc_used parity after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut = ScoreMap::new();
        let mut model: HashMap<Vec<u8>, u64> = HashMap::new();

        for op in ops {
            match op {
                OpI::Update(i, bits) => {
                    let f = &pool[i];
                    let absent = !model.contains_key(f);
                    let (e, inserted) = sut.add_or_update(f, f64::from_bits(bits));
                    prop_assert_eq!(inserted, absent);
                    prop_assert_eq!(e.field(), &f[..]);
                    prop_assert_eq!(e.score().to_bits(), bits);
                    model.insert(f.clone(), bits);
                }
                OpI::Skip(i, bits) => {
                    let f = &pool[i];
                    let absent = !model.contains_key(f);
                    let expected = *model.entry(f.clone()).or_insert(bits);
                    let (e, inserted) = sut.add_or_skip(f, f64::from_bits(bits));
                    prop_assert_eq!(inserted, absent);
                    prop_assert_eq!(e.score().to_bits(), expected);
                }
                OpI::Erase(i) => {
                    let f = &pool[i];
                    prop_assert_eq!(sut.erase(f), model.remove(f).is_some());
                    prop_assert!(sut.find(f).is_none());
                }
                OpI::Find(i) => {
                    let f = &pool[i];
                    prop_assert_eq!(sut.find(f).map(f64::to_bits), model.get(f).copied());
                }
                OpI::FindRaw(f) => {
                    prop_assert_eq!(sut.find(&f).map(f64::to_bits), model.get(&f).copied());
                    prop_assert_eq!(sut.contains(&f), model.contains_key(&f));
                }
                OpI::Clear => {
                    sut.clear();
                    model.clear();
                }
                OpI::Iterate => {
                    let mut seen: Vec<(Vec<u8>, u64)> =
                        sut.iter().map(|(f, s)| (f.to_vec(), s.to_bits())).collect();
                    let mut expected: Vec<(Vec<u8>, u64)> =
                        model.iter().map(|(f, b)| (f.clone(), *b)).collect();
                    seen.sort();
                    expected.sort();
                    prop_assert_eq!(seen, expected);
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            let used: usize = model.keys().map(|f| f.len() + crate::entry::ENTRY_OVERHEAD).sum();
            prop_assert_eq!(sut.obj_malloc_used(), used);
        }
    }
}
