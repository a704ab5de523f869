use proptest::prelude::*;
use ringside_game::{AggregateStats, BatchRunner, DistributionRequest, GameConfig};

const TRIALS: u64 = 240;

fn cut_points(raw: Vec<u64>) -> Vec<u64> {
    let mut cuts: Vec<u64> = raw.into_iter().map(|cut| cut % (TRIALS + 1)).collect();
    cuts.push(0);
    cuts.push(TRIALS);
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_partition_merges_to_the_whole(
        raw_cuts in prop::collection::vec(0..=TRIALS, 0..6),
        seed in any::<u64>(),
        reverse in any::<bool>(),
    ) {
        let config = GameConfig::standard();
        let mode = config.mode("aggressive").expect("mode");
        let runner = BatchRunner::new(&config, mode, seed, DistributionRequest::default())
            .expect("runner");
        let whole = runner.run(TRIALS);

        let cuts = cut_points(raw_cuts);
        let mut parts: Vec<AggregateStats> = cuts
            .windows(2)
            .map(|pair| runner.run_range(pair[0]..pair[1]))
            .collect();
        if reverse {
            parts.reverse();
        }
        let merged = parts
            .into_iter()
            .try_fold(AggregateStats::default(), AggregateStats::merged)
            .expect("matching edges");
        prop_assert_eq!(merged, whole);
    }

    #[test]
    fn merge_grouping_does_not_matter(
        wins_a in prop::collection::vec(0.0_f64..50.0, 0..20),
        wins_b in prop::collection::vec(0.0_f64..50.0, 0..20),
        wins_c in prop::collection::vec(0.0_f64..50.0, 0..20),
    ) {
        let config = GameConfig::standard();
        let mode = config.mode("defensive").expect("mode");
        let runner = BatchRunner::new(&config, mode, 1, DistributionRequest::default())
            .expect("runner");
        let template = runner.records(0..1).remove(0);
        let stats_for = |wins: &[f64]| {
            let mut stats = AggregateStats::default();
            for &win in wins {
                let mut outcome = template.clone();
                outcome.record.final_win = win;
                stats.record(&outcome);
            }
            stats
        };
        let (a, b, c) = (stats_for(&wins_a), stats_for(&wins_b), stats_for(&wins_c));

        let left = a.clone().merged(b.clone()).and_then(|ab| ab.merged(c.clone())).expect("left");
        let right = a.clone().merged(b.clone().merged(c.clone()).expect("bc")).expect("right");
        let swapped = c.merged(a).and_then(|ca| ca.merged(b)).expect("swapped");
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(&left, &swapped);
    }
}
