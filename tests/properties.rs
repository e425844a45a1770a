//! Property tests over randomly generated topic forests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use topic_graph_kernel::{
    analyze, CacheConfig, EngineConfig, GraphIndex, InMemoryTopicStore, PathCache, PathFinder,
    Topic, TopicGraphEngine, TopicId,
};
use uuid::Uuid;

fn id(n: usize) -> TopicId {
    TopicId::new(Uuid::from_u128(n as u128 + 1))
}

/// A forest description: for each topic, an optional earlier parent and a
/// deleted flag.
#[derive(Debug, Clone)]
struct Forest {
    parents: Vec<Option<usize>>,
    deleted: Vec<bool>,
}

impl Forest {
    fn topics(&self) -> Vec<Topic> {
        self.parents
            .iter()
            .zip(&self.deleted)
            .enumerate()
            .map(|(i, (parent, deleted))| {
                let mut topic = Topic::new(id(i), format!("t{i}"), parent.map(id));
                topic.deleted = *deleted;
                topic
            })
            .collect()
    }
}

fn forest_strategy() -> impl Strategy<Value = Forest> {
    (1usize..30).prop_flat_map(|n| {
        let parents = (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    proptest::option::weighted(0.8, 0..i).boxed()
                }
            })
            .collect::<Vec<_>>();
        let deleted = proptest::collection::vec(proptest::bool::weighted(0.15), n);
        (parents, deleted).prop_map(|(parents, deleted)| Forest { parents, deleted })
    })
}

fn component_of(report_components: &[Vec<TopicId>]) -> BTreeMap<TopicId, usize> {
    report_components
        .iter()
        .enumerate()
        .flat_map(|(c, members)| members.iter().map(move |m| (*m, c)))
        .collect()
}

proptest! {
    #[test]
    fn self_paths_and_zero_radius(forest in forest_strategy()) {
        let index = GraphIndex::build(forest.topics());
        let finder = PathFinder::new(&index);

        for t in index.node_ids() {
            prop_assert_eq!(finder.shortest_path(t, t, None).unwrap(), vec![t]);
            prop_assert_eq!(finder.distance(t, t).unwrap(), Some(0));
            prop_assert_eq!(finder.topics_within_distance(t, 0).unwrap(), BTreeSet::from([t]));
        }
    }

    #[test]
    fn paths_agree_with_components(forest in forest_strategy()) {
        let index = GraphIndex::build(forest.topics());
        let finder = PathFinder::new(&index);
        let report = analyze(&index);
        let component = component_of(&report.components);

        let ids: Vec<TopicId> = index.node_ids().collect();
        for &a in &ids {
            let reachable = finder.topics_by_distance(a, ids.len()).unwrap();
            for &b in &ids {
                let path = finder.shortest_path(a, b, None).unwrap();
                let same_component = component[&a] == component[&b];

                if same_component {
                    prop_assert_eq!(path.first(), Some(&a));
                    prop_assert_eq!(path.last(), Some(&b));
                    for step in path.windows(2) {
                        prop_assert!(index.neighbors(&step[0]).unwrap().contains(&step[1]));
                    }
                    prop_assert_eq!(finder.distance(a, b).unwrap(), Some(path.len() - 1));
                    prop_assert_eq!(reachable.get(&b), Some(&(path.len() - 1)));
                } else {
                    prop_assert!(path.is_empty());
                    prop_assert_eq!(finder.distance(a, b).unwrap(), None);
                    prop_assert!(!finder.are_connected(a, b).unwrap());
                    prop_assert!(!reachable.contains_key(&b));
                }
            }
        }
    }

    #[test]
    fn partition_covers_live_topics_once(forest in forest_strategy()) {
        let index = GraphIndex::build(forest.topics());
        let report = analyze(&index);

        let mut covered: Vec<TopicId> = report.components.iter().flatten().copied().collect();
        covered.sort();
        let live: Vec<TopicId> = index.node_ids().collect();
        prop_assert_eq!(covered, live);

        let isolated: Vec<TopicId> = index
            .node_ids()
            .filter(|t| index.degree(t) == Some(0))
            .collect();
        prop_assert_eq!(&report.isolated_topics, &isolated);
        prop_assert_eq!(report.is_fully_connected, report.component_count <= 1);
    }

    #[test]
    fn depth_bound_never_exceeded(forest in forest_strategy(), bound in 0usize..6) {
        let index = GraphIndex::build(forest.topics());
        let finder = PathFinder::new(&index);

        let ids: Vec<TopicId> = index.node_ids().collect();
        for &a in &ids {
            for &b in &ids {
                let full = finder.shortest_path(a, b, None).unwrap();
                let bounded = finder.shortest_path(a, b, Some(bound)).unwrap();
                if !full.is_empty() && full.len() - 1 <= bound {
                    prop_assert_eq!(bounded, full);
                } else {
                    prop_assert!(bounded.is_empty());
                }
            }
        }
    }

    #[test]
    fn cached_engine_matches_uncached(forest in forest_strategy(), delete_at in 0usize..30) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryTopicStore::new());
            for topic in forest.topics() {
                store.insert_raw(topic);
            }

            let cache = Arc::new(PathCache::default());
            store.subscribe(cache.clone());
            let cached = TopicGraphEngine::new(store.clone(), cache);
            let uncached = TopicGraphEngine::with_config(
                store.clone(),
                EngineConfig {
                    cache: CacheConfig { max_entries: 0, enabled: false },
                },
            );

            let ids: Vec<TopicId> = (0..forest.parents.len()).map(id).collect();
            let victim = id(delete_at % ids.len());

            for round in 0..2 {
                for &a in &ids {
                    for &b in &ids {
                        let warm = cached.shortest_path(a, b).await;
                        let cold = uncached.shortest_path(a, b).await;
                        assert_eq!(warm, cold, "round {round}: {a} -> {b}");
                    }
                }
                // Flip the victim between rounds; the cache must follow
                if store.soft_delete(&victim).is_err() {
                    let _ = store.restore(&victim);
                }
            }
        });
    }
}
