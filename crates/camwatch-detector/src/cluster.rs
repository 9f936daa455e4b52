//! Density-based clustering (DBSCAN) over frame indices and 3-D positions.
//!
//! A point's neighbourhood is every point within `eps` of it, itself
//! included. Points whose neighbourhood holds at least `min_samples` points
//! are core points; clusters grow through chains of core points and absorb
//! the non-core points they reach. Points reached by no cluster are noise
//! and are left out of the result.

use std::collections::VecDeque;

use camwatch_models::Vec3;

/// One cluster, as indices into the clustered input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    members: Vec<usize>,
}

impl Cluster {
    fn new(mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        Self { members }
    }

    /// Member indices, ascending.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// (min, max) frame over the members, given the frame of each input.
    pub fn frame_extent(&self, frames: &[u32]) -> Option<(u32, u32)> {
        let mut it = self.members.iter().filter_map(|&i| frames.get(i).copied());
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), f| (lo.min(f), hi.max(f))))
    }
}

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples: min_samples.max(1),
        }
    }

    /// Cluster scalar values (frame indices). Clusters come back ordered by
    /// their smallest value.
    pub fn fit_1d(&self, values: &[f64]) -> Vec<Cluster> {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        if self.min_samples == 1 {
            // Every point is core, so clusters are the runs without a gap wider than eps.
            let mut clusters = Vec::new();
            let mut current: Vec<usize> = Vec::new();
            for (pos, &idx) in order.iter().enumerate() {
                if pos > 0 && sorted[pos] - sorted[pos - 1] > self.eps {
                    clusters.push(Cluster::new(std::mem::take(&mut current)));
                }
                current.push(idx);
            }
            if !current.is_empty() {
                clusters.push(Cluster::new(current));
            }
            return clusters;
        }

        let eps = self.eps;
        let mut clusters = self.expand(values.len(), |i| {
            let v = values[i];
            let lo = sorted.partition_point(|&x| x < v - eps);
            let hi = sorted.partition_point(|&x| x <= v + eps);
            order[lo..hi].to_vec()
        });
        clusters.sort_by(|a, b| {
            let min = |c: &Cluster| c.members.iter().map(|&i| values[i]).fold(f64::INFINITY, f64::min);
            min(a).total_cmp(&min(b))
        });
        clusters
    }

    /// Cluster 3-D positions by Euclidean distance. Clusters come back
    /// ordered by their first member index.
    pub fn fit_3d(&self, points: &[Vec3]) -> Vec<Cluster> {
        let mut clusters = self.expand(points.len(), |i| {
            (0..points.len())
                .filter(|&j| points[i].distance(&points[j]) <= self.eps)
                .collect()
        });
        clusters.sort_by_key(|c| c.members.first().copied());
        clusters
    }

    fn expand<F>(&self, n: usize, neighbors: F) -> Vec<Cluster>
    where
        F: Fn(usize) -> Vec<usize>,
    {
        let mut assigned: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for p in 0..n {
            if visited[p] {
                continue;
            }
            visited[p] = true;

            let seeds = neighbors(p);
            if seeds.len() < self.min_samples {
                continue;
            }

            let id = clusters.len();
            clusters.push(vec![p]);
            assigned[p] = Some(id);

            let mut queue: VecDeque<usize> = seeds.into();
            while let Some(q) = queue.pop_front() {
                if assigned[q].is_none() {
                    assigned[q] = Some(id);
                    clusters[id].push(q);
                }
                if visited[q] {
                    continue;
                }
                visited[q] = true;

                let reach = neighbors(q);
                if reach.len() >= self.min_samples {
                    queue.extend(reach);
                }
            }
        }

        clusters.into_iter().map(Cluster::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents(values: &[f64], clusters: &[Cluster]) -> Vec<(f64, f64)> {
        clusters
            .iter()
            .map(|c| {
                let vs: Vec<f64> = c.members().iter().map(|&i| values[i]).collect();
                (
                    vs.iter().cloned().fold(f64::INFINITY, f64::min),
                    vs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                )
            })
            .collect()
    }

    /// Deterministic pseudo-random frame sequences.
    fn sequences() -> Vec<Vec<f64>> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        (0..50)
            .map(|_| {
                let len = (next() % 40) as usize;
                (0..len).map(|_| (next() % 3000) as f64).collect()
            })
            .collect()
    }

    #[test]
    fn test_gap_splitting() {
        let values = [10.0, 20.0, 900.0, 15.0, 1301.0];
        let clusters = Dbscan::new(400.0, 1).fit_1d(&values);
        assert_eq!(extents(&values, &clusters), vec![(10.0, 20.0), (900.0, 1301.0)]);
    }

    #[test]
    fn test_distance_equal_to_eps_is_neighbour() {
        let values = [0.0, 400.0, 801.0];
        let clusters = Dbscan::new(400.0, 1).fit_1d(&values);
        assert_eq!(extents(&values, &clusters), vec![(0.0, 400.0), (801.0, 801.0)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(Dbscan::new(400.0, 1).fit_1d(&[]).is_empty());
        assert!(Dbscan::new(20.0, 3).fit_3d(&[]).is_empty());
    }

    #[test]
    fn test_partition_and_eps_properties() {
        let dbscan = Dbscan::new(50.0, 1);
        for values in sequences() {
            let clusters = dbscan.fit_1d(&values);

            let mut seen = vec![0usize; values.len()];
            for c in &clusters {
                for &i in c.members() {
                    seen[i] += 1;
                }
            }
            assert!(seen.iter().all(|&n| n == 1), "not a partition: {:?}", values);

            let mut owner = vec![usize::MAX; values.len()];
            for (id, c) in clusters.iter().enumerate() {
                for &i in c.members() {
                    owner[i] = id;
                }
            }
            for i in 0..values.len() {
                for j in 0..values.len() {
                    if (values[i] - values[j]).abs() <= 50.0 {
                        assert_eq!(owner[i], owner[j]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_general_path_matches_fast_path() {
        for values in sequences() {
            let fast = Dbscan::new(50.0, 1).fit_1d(&values);
            let general = Dbscan { eps: 50.0, min_samples: 1 }.expand(values.len(), |i| {
                (0..values.len())
                    .filter(|&j| (values[i] - values[j]).abs() <= 50.0)
                    .collect()
            });
            let mut a = extents(&values, &fast);
            let mut b = extents(&values, &general);
            a.sort_by(|x, y| x.0.total_cmp(&y.0));
            b.sort_by(|x, y| x.0.total_cmp(&y.0));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_min_samples_marks_noise() {
        let values = [0.0, 1.0, 2.0, 100.0];
        let clusters = Dbscan::new(1.0, 3).fit_1d(&values);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members(), &[0, 1, 2]);
    }

    #[test]
    fn test_fit_3d_groups_nearby_points() {
        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(500.0, 0.0, 0.0),
            Vec3::new(505.0, 0.0, 0.0),
            Vec3::new(510.0, 0.0, 0.0),
            Vec3::new(2000.0, 0.0, 0.0),
        ];
        let clusters = Dbscan::new(20.0, 3).fit_3d(&points);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members(), &[0, 1, 2]);
        assert_eq!(clusters[1].members(), &[3, 4, 5]);
    }

    #[test]
    fn test_frame_extent() {
        let cluster = Cluster::new(vec![2, 0]);
        assert_eq!(cluster.frame_extent(&[40, 7, 12]), Some((12, 40)));
        assert_eq!(Cluster::new(vec![]).frame_extent(&[1]), None);
    }
}
