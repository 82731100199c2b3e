//! Whole-engine tests against a naive stable comparison sort.

use std::cmp::Ordering;

use proptest::{collection::vec, option, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    is_sorted, order_with, rleid, Column, Complex64, Direction, KeySpec, MissingPlacement,
    OrderConfig, OrderOptions, OrderResult, Scheduler, SortKey, Table, NA_INT64,
};

const CASES: u32 = 64;

const SCHEDULERS: [Scheduler; 4] = [
    Scheduler::Sequential,
    Scheduler::Rayon,
    Scheduler::Raw,
    Scheduler::Chili,
];

fn options(config: OrderConfig) -> OrderOptions {
    OrderOptions::default().with_config(config)
}

fn sequential() -> OrderOptions {
    options(OrderConfig::sequential())
}

/// Every thread engaged even for tiny inputs.
fn parallel(scheduler: Scheduler, threads: usize) -> OrderOptions {
    options(
        OrderConfig::sequential()
            .with_scheduler(scheduler)
            .with_threads(threads)
            .with_throttle(1),
    )
}

fn compare_present(column: &Column, a: usize, b: usize) -> Ordering {
    match column {
        Column::Bool(v) => v[a].cmp(&v[b]),
        Column::Int8(v) => v[a].cmp(&v[b]),
        Column::Int16(v) => v[a].cmp(&v[b]),
        Column::Int32(v) => v[a].cmp(&v[b]),
        Column::Int64(v) => v[a].cmp(&v[b]),
        Column::Float64(v) => float_cmp(v[a], v[b]),
        Column::BigInt(v) => (v[a].to_bits() as i64).cmp(&(v[b].to_bits() as i64)),
        Column::Complex(v) => float_cmp(v[a].re, v[b].re).then(float_cmp(v[a].im, v[b].im)),
        Column::Str(v) => v[a].cmp(&v[b]),
        Column::List(_) => unreachable!("list columns are not keys"),
    }
}

/// `-0.0` and `0.0` compare equal.
fn float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare_key(table: &Table, key: &SortKey, a: usize, b: usize) -> Ordering {
    let column = &table.columns()[key.column];
    let missing_first = key.missing == MissingPlacement::First;
    match (column.is_missing(a), column.is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) if missing_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if missing_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match key.direction {
            Direction::Ascending => compare_present(column, a, b),
            Direction::Descending => compare_present(column, a, b).reverse(),
        },
    }
}

fn compare_rows(table: &Table, spec: &KeySpec, a: usize, b: usize) -> Ordering {
    spec.keys()
        .iter()
        .map(|key| compare_key(table, key, a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable comparison sort and the groups it implies.
fn reference(table: &Table, spec: &KeySpec) -> (Vec<usize>, Vec<usize>) {
    let n = table.num_rows();
    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.sort_by(|&a, &b| compare_rows(table, spec, a, b));
    let starts = (0..n)
        .filter(|&p| {
            p == 0 || compare_rows(table, spec, permutation[p - 1], permutation[p]).is_ne()
        })
        .collect();
    (permutation, starts)
}

fn take(column: &Column, rows: &[usize]) -> Column {
    fn pick<T: Clone>(values: &[T], rows: &[usize]) -> Vec<T> {
        rows.iter().map(|&r| values[r].clone()).collect()
    }
    match column {
        Column::Bool(v) => Column::Bool(pick(v, rows)),
        Column::Int8(v) => Column::Int8(pick(v, rows)),
        Column::Int16(v) => Column::Int16(pick(v, rows)),
        Column::Int32(v) => Column::Int32(pick(v, rows)),
        Column::Int64(v) => Column::Int64(pick(v, rows)),
        Column::Float64(v) => Column::Float64(pick(v, rows)),
        Column::BigInt(v) => Column::BigInt(pick(v, rows)),
        Column::Complex(v) => Column::Complex(pick(v, rows)),
        Column::Str(v) => Column::Str(pick(v, rows)),
        Column::List(v) => Column::List(pick(v, rows)),
    }
}

fn reorder(table: &Table, rows: &[usize]) -> Table {
    Table::new(table.columns().iter().map(|c| take(c, rows)).collect())
}

fn float_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(-0.0),
        Just(0.0),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        (-20i32..20).prop_map(|v| v as f64 / 4.0),
        any::<f64>(),
    ]
}

fn text_value() -> impl Strategy<Value = Option<String>> {
    option::of(
        vec(prop_oneof![Just('a'), Just('b'), Just('\0'), Just('é')], 0..4)
            .prop_map(String::from_iter),
    )
}

fn column(n: usize) -> impl Strategy<Value = Column> {
    prop_oneof![
        vec(option::of(any::<bool>()), n).prop_map(Column::Bool),
        vec(option::of(-3i8..3), n).prop_map(Column::Int8),
        vec(option::of(any::<i16>()), n).prop_map(Column::Int16),
        vec(option::of(-50i32..50), n).prop_map(Column::Int32),
        vec(prop_oneof![Just(NA_INT64), -5i64..5, any::<i64>()], n).prop_map(Column::Int64),
        vec(float_value(), n).prop_map(Column::Float64),
        vec(prop_oneof![Just(NA_INT64), -1000i64..1000], n).prop_map(Column::big_int),
        vec((float_value(), -2i32..2), n).prop_map(|v| Column::Complex(
            v.into_iter()
                .map(|(re, im)| Complex64::new(re, im as f64))
                .collect()
        )),
        vec(text_value(), n).prop_map(Column::Str),
    ]
}

/// A table of one to three key columns and a spec over all of them.
fn keyed_table() -> impl Strategy<Value = (Table, KeySpec)> {
    (0usize..300).prop_flat_map(|n| {
        (
            vec(column(n), 1..4),
            vec((any::<bool>(), any::<bool>()), 3),
        )
            .prop_map(|(columns, flags)| {
                let spec = columns
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        let (descending, missing_first) = flags[i];
                        SortKey::new(
                            i,
                            if descending {
                                Direction::Descending
                            } else {
                                Direction::Ascending
                            },
                            if missing_first {
                                MissingPlacement::First
                            } else {
                                MissingPlacement::Last
                            },
                        )
                    })
                    .collect();
                (Table::new(columns), spec)
            })
    })
}

fn assert_matches_reference(table: &Table, spec: &KeySpec, result: &OrderResult) {
    let n = table.num_rows();
    let (permutation, starts) = reference(table, spec);
    assert_eq!(result.permutation, permutation);
    assert_eq!(result.starts(), starts.as_slice());
    assert_eq!(result.lengths().iter().sum::<usize>(), n);
    assert_eq!(result.all_singleton(), starts.len() == n);
    assert_eq!(result.single_group(), starts.len() == 1);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn matches_stable_reference((table, spec) in keyed_table()) {
        let result = order_with(&table, &spec, &sequential()).unwrap();
        assert_matches_reference(&table, &spec, &result);

        let any_missing = spec
            .keys()
            .iter()
            .any(|k| (0..table.num_rows()).any(|r| table.columns()[k.column].is_missing(r)));
        prop_assert_eq!(result.any_missing, any_missing);
    }

    #[test]
    fn identical_across_threads_and_schedulers((table, spec) in keyed_table()) {
        let expected = order_with(&table, &spec, &sequential()).unwrap();
        for scheduler in SCHEDULERS {
            for threads in [1, 8] {
                let result = order_with(&table, &spec, &parallel(scheduler, threads)).unwrap();
                prop_assert_eq!(&result.permutation, &expected.permutation);
                prop_assert_eq!(&result.groups, &expected.groups);
            }
        }
    }

    #[test]
    fn ordering_sorted_output_is_identity((table, spec) in keyed_table()) {
        let first = order_with(&table, &spec, &sequential()).unwrap();
        let sorted = reorder(&table, &first.permutation);
        prop_assert!(is_sorted(&sorted, &spec).unwrap());

        let second = order_with(&sorted, &spec, &parallel(Scheduler::Raw, 4)).unwrap();
        let identity: Vec<usize> = (0..table.num_rows()).collect();
        prop_assert_eq!(second.permutation, identity);
        prop_assert_eq!(second.groups, first.groups);
    }

    #[test]
    fn first_appearance_orders_groups_by_first_row((table, spec) in keyed_table()) {
        let by_key = order_with(&table, &spec, &sequential()).unwrap();
        let result = order_with(&table, &spec, &sequential().first_appearance(true)).unwrap();
        prop_assert_eq!(result.groups.len(), by_key.groups.len());

        let firsts: Vec<usize> = result
            .groups
            .iter()
            .map(|g| result.permutation[g.start])
            .collect();
        prop_assert!(firsts.windows(2).all(|w| w[0] < w[1]));
        for group in result.groups.iter() {
            let rows = &result.permutation[group];
            prop_assert!(rows.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(rows
                .iter()
                .all(|&r| compare_rows(&table, &spec, rows[0], r).is_eq()));
        }
    }

    #[test]
    fn rleid_counts_runs((table, spec) in keyed_table()) {
        let columns: Vec<usize> = spec.keys().iter().map(|k| k.column).collect();
        let ids = rleid(&table, &columns).unwrap();
        let ascending = KeySpec::ascending(columns.iter().copied());
        for row in 1..table.num_rows() {
            let same = compare_rows(&table, &ascending, row - 1, row).is_eq();
            prop_assert_eq!(ids[row] == ids[row - 1], same);
            prop_assert!(ids[row] - ids[row - 1] <= 1);
        }
    }
}

#[test]
fn single_integer_column_with_missing() {
    let table = Table::new(vec![Column::Int32(vec![
        Some(3),
        Some(1),
        Some(2),
        Some(1),
        None,
    ])]);
    let spec = KeySpec::new().asc(0).missing(MissingPlacement::Last);
    for options in [sequential(), parallel(Scheduler::Rayon, 8)] {
        let result = order_with(&table, &spec, &options).unwrap();
        assert_eq!(result.permutation, vec![1, 3, 2, 0, 4]);
        assert_eq!(result.starts(), &[0, 2, 3, 4]);
        assert_eq!(result.lengths(), &[2, 1, 1, 1]);
        assert!(!result.all_singleton());
        assert!(!result.single_group());
    }
}

#[test]
fn ascending_then_descending_keys() {
    let table = Table::new(vec![
        Column::Int32(vec![Some(1), Some(1), Some(2)]),
        Column::Int32(vec![Some(5), Some(3), Some(9)]),
    ]);
    let result = order_with(&table, &KeySpec::new().asc(0).desc(1), &sequential()).unwrap();
    assert_eq!(result.permutation, vec![0, 1, 2]);

    // Groups of the leading key alone
    let by_first = order_with(&table, &KeySpec::new().asc(0), &sequential()).unwrap();
    assert_eq!(by_first.starts(), &[0, 2]);
    assert_eq!(by_first.lengths(), &[2, 1]);
}

#[test]
fn all_equal_values_form_one_group() {
    let table = Table::new(vec![Column::Int32(vec![Some(7), Some(7), Some(7)])]);
    for scheduler in SCHEDULERS {
        let result = order_with(&table, &KeySpec::new().asc(0), &parallel(scheduler, 8)).unwrap();
        assert_eq!(result.permutation, vec![0, 1, 2]);
        assert_eq!(result.starts(), &[0]);
        assert_eq!(result.lengths(), &[3]);
        assert!(result.single_group());
    }
}

#[test]
fn large_random_table_matches_reference() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let n = 60_000;
    let ints: Vec<Option<i32>> = (0..n)
        .map(|_| rng.random_bool(0.95).then(|| rng.random_range(-500..500)))
        .collect();
    let words: Vec<Option<String>> = (0..n)
        .map(|_| {
            rng.random_bool(0.9).then(|| {
                let len = rng.random_range(0..6);
                (0..len).map(|_| rng.random_range(b'a'..=b'e') as char).collect()
            })
        })
        .collect();
    let complex: Vec<Complex64> = (0..n)
        .map(|_| Complex64::new(rng.random_range(-3..3) as f64, rng.random_range(-1e6..1e6)))
        .collect();
    let table = Table::new(vec![
        Column::Int32(ints),
        Column::Str(words),
        Column::Complex(complex),
    ]);
    let spec = KeySpec::new()
        .desc(1)
        .missing(MissingPlacement::First)
        .asc(0)
        .desc(2);

    let expected = order_with(&table, &spec, &sequential()).unwrap();
    assert_matches_reference(&table, &spec, &expected);
    assert!(expected.stats.radix_passes > 0);

    for scheduler in SCHEDULERS {
        let config = OrderConfig::sequential()
            .with_scheduler(scheduler)
            .with_threads(8);
        let result = order_with(&table, &spec, &options(config)).unwrap();
        assert_eq!(result.permutation, expected.permutation, "{scheduler}");
        assert_eq!(result.groups, expected.groups, "{scheduler}");
    }
}

#[test]
fn nested_prefixes_past_depth_bound_match_reference() {
    let n = 400;
    let words = Column::strings((0..n).map(|k| {
        let mut word = "a".repeat(k % 150 + 1);
        if k % 3 == 0 {
            word.push('b');
        }
        Some(word)
    }));
    let ranks = Column::Int32((0..n).map(|k| Some((k % 7) as i32)).collect());
    let table = Table::new(vec![words, ranks]);
    let spec = KeySpec::new().asc(0).desc(1);

    let expected = order_with(&table, &spec, &sequential()).unwrap();
    assert_matches_reference(&table, &spec, &expected);
    assert!(expected.stats.depth_fallbacks > 0, "{:?}", expected.stats);

    for scheduler in SCHEDULERS {
        for threads in [2, 8] {
            let result = order_with(&table, &spec, &parallel(scheduler, threads)).unwrap();
            assert_eq!(result.permutation, expected.permutation, "{scheduler} {threads}");
            assert_eq!(result.groups, expected.groups, "{scheduler} {threads}");
            assert!(result.stats.depth_fallbacks > 0, "{scheduler} {threads}");
        }
    }
}

#[test]
fn wide_integer_keys_use_every_byte() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 20_000;
    let values: Vec<i64> = (0..n)
        .map(|i| {
            if i % 1000 == 0 {
                NA_INT64
            } else {
                rng.random()
            }
        })
        .collect();
    let table = Table::new(vec![Column::Int64(values)]);
    let spec = KeySpec::new().desc(0);
    let result = order_with(&table, &spec, &parallel(Scheduler::Raw, 4)).unwrap();
    assert_matches_reference(&table, &spec, &result);
}
