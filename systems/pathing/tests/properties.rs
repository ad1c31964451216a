use proptest::prelude::*;
use skirmish_system_pathing::{PathCost, PathSolver, Topology};

const SIDE: i32 = 7;

#[derive(Debug)]
struct Field {
    walls: Vec<bool>,
    weights: Vec<f64>,
}

impl Field {
    fn index(node: (i32, i32)) -> Option<usize> {
        let inside = (0..SIDE).contains(&node.0) && (0..SIDE).contains(&node.1);
        inside.then(|| (node.1 * SIDE + node.0) as usize)
    }

    fn open(&self, node: (i32, i32)) -> bool {
        Self::index(node).map_or(false, |index| !self.walls[index])
    }
}

impl Topology for Field {
    type Node = (i32, i32);

    fn neighbors(&self, node: (i32, i32), out: &mut Vec<(i32, i32)>) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let next = (node.0 + dx, node.1 + dy);
                if self.open(next) {
                    out.push(next);
                }
            }
        }
    }
}

impl PathCost<(i32, i32)> for Field {
    fn edge_cost(&self, from: (i32, i32), to: (i32, i32)) -> f64 {
        let length = if from.0 != to.0 && from.1 != to.1 {
            std::f64::consts::SQRT_2
        } else {
            1.0
        };
        let weight = Self::index(to).map_or(f64::INFINITY, |index| self.weights[index]);
        length * weight
    }

    fn heuristic(&self, from: (i32, i32), to: (i32, i32)) -> f64 {
        let dx = f64::from((from.0 - to.0).abs());
        let dy = f64::from((from.1 - to.1).abs());
        (dx.max(dy) - dx.min(dy) + dx.min(dy) * std::f64::consts::SQRT_2) * 0.999
    }
}

fn reference_cost(field: &Field, start: (i32, i32), goal: (i32, i32)) -> Option<f64> {
    let cells = (SIDE * SIDE) as usize;
    let mut best = vec![f64::INFINITY; cells];
    let mut done = vec![false; cells];
    best[Field::index(start)?] = 0.0;

    loop {
        let current = (0..cells)
            .filter(|&index| !done[index] && best[index].is_finite())
            .min_by(|&a, &b| best[a].total_cmp(&best[b]))?;
        done[current] = true;
        let node = ((current as i32) % SIDE, (current as i32) / SIDE);
        if node == goal {
            return Some(best[current]);
        }
        let mut neighbors = Vec::new();
        field.neighbors(node, &mut neighbors);
        for next in neighbors {
            let Some(index) = Field::index(next) else {
                continue;
            };
            let candidate = best[current] + field.edge_cost(node, next);
            if candidate < best[index] {
                best[index] = candidate;
            }
        }
    }
}

fn arb_field() -> impl Strategy<Value = Field> {
    let cells = (SIDE * SIDE) as usize;
    (
        proptest::collection::vec(prop::bool::weighted(0.25), cells),
        proptest::collection::vec(1.0f64..4.0, cells),
    )
        .prop_map(|(walls, weights)| Field { walls, weights })
}

proptest! {
    #[test]
    fn solver_matches_exhaustive_search(
        mut field in arb_field(),
        start in (0..SIDE, 0..SIDE),
        goal in (0..SIDE, 0..SIDE),
    ) {
        for node in [start, goal] {
            if let Some(index) = Field::index(node) {
                field.walls[index] = false;
            }
        }

        let mut solver = PathSolver::new(&field, &[start]);
        let found = solver.solve(&field, &field, start, &[goal]);
        let expected = reference_cost(&field, start, goal);

        match (found, expected) {
            (Some(path), Some(cost)) => {
                prop_assert!((path.total_cost() - cost).abs() < 1e-9);
                prop_assert_eq!(path.start(), Some(start));
                prop_assert_eq!(path.destination(), Some(goal));
                prop_assert!(path.total_cost() + 1e-9 >= field.heuristic(start, goal));
                for pair in path.costs().windows(2) {
                    prop_assert!(pair[1] >= pair[0]);
                }
            }
            (None, None) => {}
            (found, expected) => {
                prop_assert!(false, "solver {:?} disagrees with reference {:?}", found.map(|path| path.total_cost()), expected);
            }
        }
    }

    #[test]
    fn repeated_queries_are_stable(field in arb_field(), goal in (0..SIDE, 0..SIDE)) {
        let start = (0, 0);
        let mut solver = PathSolver::new(&field, &[start]);
        let first = solver.solve(&field, &field, start, &[goal]);
        let second = solver.solve(&field, &field, start, &[goal]);
        prop_assert_eq!(first, second);
    }
}
