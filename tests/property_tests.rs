//! Property-based tests for the access model, the solver and schedules.

use loopchain::prelude::*;
use loopchain::transform::compute_shift_tuples_for_fusion;
use proptest::prelude::*;

fn tuple_pair(max_dims: usize) -> impl Strategy<Value = (Tuple, Tuple)> {
    (1..=max_dims).prop_flat_map(|d| {
        (
            prop::collection::vec(-1000i64..1000, d),
            prop::collection::vec(-1000i64..1000, d),
        )
            .prop_map(|(a, b)| (Tuple::new(a), Tuple::new(b)))
    })
}

fn collection_and_extent() -> impl Strategy<Value = (Vec<Vec<i64>>, Vec<i64>)> {
    (1usize..4).prop_flat_map(|d| {
        (
            prop::collection::vec(prop::collection::vec(-50i64..50, d), 1..8),
            prop::collection::vec(-50i64..50, d),
        )
    })
}

fn nest_with(reads: &[i64], writes: &[i64]) -> LoopNest {
    let collect = |v: &[i64]| TupleCollection::with_dimensions(v.iter().map(|&x| Tuple::new(vec![x])), 1).unwrap();
    LoopNest::with_dataspaces(
        RectangularDomain::new([("0", "N")], ["N"]).unwrap(),
        vec![Dataspace::new("A", collect(reads), collect(writes)).unwrap()],
    )
}

proptest! {
    #[test]
    fn test_tuple_group_laws((a, b) in tuple_pair(4)) {
        prop_assert_eq!(&(&a + &b) - &b, a.clone());
        prop_assert_eq!(-(-a.clone()), a.clone());
        prop_assert!((&a + &(-&a)).is_zero());
    }

    #[test]
    fn test_shift_all_moves_extremes((offsets, extent) in collection_and_extent()) {
        let mut collection = TupleCollection::new(offsets.into_iter().map(Tuple::new)).unwrap();
        let extent = Tuple::new(extent);
        let min = collection.min_on_dims().unwrap();
        let max = collection.max_on_dims().unwrap();
        collection.shift_all(&extent).unwrap();
        prop_assert_eq!(collection.min_on_dims().unwrap(), &min + &extent);
        prop_assert_eq!(collection.max_on_dims().unwrap(), &max + &extent);
    }

    #[test]
    fn test_two_loop_shift_is_minimal(write in -5i64..5, read in -5i64..5) {
        // loop 0 writes A[i + write], loop 1 reads A[i + read]
        let chain: LoopChain = vec![nest_with(&[], &[write]), nest_with(&[read], &[])].into_iter().collect();
        let shifts = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::default())
            .unwrap();
        let distance = read - write;
        prop_assert_eq!(shifts[&0].values(), &[(-distance).max(0)][..]);
        prop_assert_eq!(shifts[&1].values(), &[distance.max(0)][..]);
    }

    #[test]
    fn test_schedule_width(dims in prop::collection::vec(1usize..4, 1..5)) {
        let chain: LoopChain = dims
            .iter()
            .map(|&d| LoopNest::new(RectangularDomain::new(vec![("0", "9"); d], Vec::<String>::new()).unwrap()))
            .collect();
        let width = *dims.iter().max().unwrap();
        let schedule = Schedule::new(chain);
        prop_assert_eq!(schedule.domains().len(), dims.len());
        prop_assert_eq!(schedule.subspace_manager().size(), width + 2);
        prop_assert_eq!(schedule.subspace_manager().input_iterators().split(',').count(), width + 2);
        for k in 0..dims.len() {
            let statement = format!("statement_{}[", k);
            prop_assert!(schedule.transformations()[0].contains(&statement));
        }
    }

    #[test]
    fn test_tiling_adds_one_coordinate_per_dimension(dims in 1usize..4, size in 1i64..64) {
        let bounds = vec![("0", "N"); dims];
        let chain: LoopChain = vec![LoopNest::new(RectangularDomain::new(bounds, ["N"]).unwrap())].into_iter().collect();
        let mut schedule = Schedule::new(chain);
        schedule.apply(&Tile::uniform(0, size.to_string()).into()).unwrap();
        prop_assert_eq!(schedule.subspace_manager().len(), 3);
        prop_assert_eq!(schedule.subspace_manager().size(), 2 * dims + 3);
        prop_assert_eq!(schedule.transformations().len(), 2);
    }
}
