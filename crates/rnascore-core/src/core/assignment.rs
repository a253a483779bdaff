//! Minimum-cost bipartite matching on a rectangular cost matrix.
//!
//! Shortest augmenting path Hungarian algorithm with row/column potentials,
//! O(n² m) for an n × m matrix with n ≤ m. Forbidden cells (`None`) are replaced by a
//! penalty larger than any achievable valid total, so the solver first maximizes the
//! number of valid pairs and then minimizes their cost. Pairs landing on forbidden cells
//! are dropped from the result.

/// Optimal assignment for `costs[row][col]`, returned as `(row, col)` pairs sorted by row.
///
/// Rows must all have the same length. An empty matrix or a matrix with no valid cell
/// yields an empty assignment.
pub fn solve(costs: &[Vec<Option<f64>>]) -> Vec<(usize, usize)> {
    let rows = costs.len();
    let cols = costs.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 || costs.iter().any(|row| row.len() != cols) {
        return Vec::new();
    }

    let max_abs = costs
        .iter()
        .flatten()
        .flatten()
        .fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let forbidden = (max_abs + 1.0) * 2.0 * (rows.max(cols) as f64 + 1.0);

    let dense = |r: usize, c: usize| costs[r][c].unwrap_or(forbidden);

    let mut pairs = if rows <= cols {
        hungarian(rows, cols, dense)
    } else {
        hungarian(cols, rows, |r, c| dense(c, r))
            .into_iter()
            .map(|(c, r)| (r, c))
            .collect()
    };

    pairs.retain(|&(r, c)| costs[r][c].is_some());
    pairs.sort_unstable();
    pairs
}

/// Total cost of an assignment, ignoring pairs on forbidden cells.
pub fn total_cost(costs: &[Vec<Option<f64>>], pairs: &[(usize, usize)]) -> f64 {
    pairs
        .iter()
        .filter_map(|&(r, c)| costs.get(r).and_then(|row| row.get(c)).copied().flatten())
        .sum()
}

/// Requires `n <= m`; every row is matched.
fn hungarian(n: usize, m: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<(usize, usize)> {
    // 1-based indexing; column 0 is the virtual source of each augmenting path.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect()
}
