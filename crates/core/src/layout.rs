use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::model::span::{LayoutSpan, RawSpan, TraceLayout};

/// Build the waterfall layout for one batch of spans.
///
/// Every input span appears exactly once in the result. Spans whose parent
/// is missing from the batch (or is the span itself) become roots. When
/// `span_id`s repeat, parent references resolve to the last occurrence.
pub fn compute_layout(raw_spans: &[RawSpan]) -> TraceLayout {
    if raw_spans.is_empty() {
        return TraceLayout::empty();
    }

    let n = raw_spans.len();
    let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (idx, span) in raw_spans.iter().enumerate() {
        lookup.insert(span.span_id.as_str(), idx);
    }
    let duplicates = n - lookup.len();
    if duplicates > 0 {
        debug!(duplicates, "duplicate span ids resolved to last occurrence");
    }

    let mut parent_of: Vec<Option<usize>> = raw_spans
        .iter()
        .enumerate()
        .map(|(idx, span)| {
            span.parent_span_id
                .as_deref()
                .and_then(|pid| lookup.get(pid).copied())
                .filter(|&parent| parent != idx)
        })
        .collect();

    break_cycles(raw_spans, &mut parent_of);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (idx, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(idx),
            None => roots.push(idx),
        }
    }

    let order = |a: &usize, b: &usize| sibling_order(raw_spans, *a, *b);
    roots.sort_by(order);
    for list in &mut children {
        list.sort_by(order);
    }

    // Pre-order walk with an explicit stack so deep traces cannot exhaust
    // the call stack.
    let mut row_of = vec![0usize; n];
    let mut visits: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&idx| (idx, 0)).collect();
    while let Some((idx, depth)) = stack.pop() {
        row_of[idx] = visits.len();
        visits.push((idx, depth));
        for &child in children[idx].iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    let spans: Vec<LayoutSpan> = visits
        .iter()
        .map(|&(idx, depth)| {
            let span = &raw_spans[idx];
            LayoutSpan {
                span: span.clone(),
                depth,
                row_index: row_of[idx],
                is_error: span.is_error(),
                children: children[idx].iter().map(|&child| row_of[child]).collect(),
            }
        })
        .collect();
    let roots = roots.iter().map(|&idx| row_of[idx]).collect::<Vec<_>>();

    let (trace_start, trace_end) = time_bounds(raw_spans);
    let layout = TraceLayout {
        spans,
        roots,
        trace_start,
        trace_end,
        total_duration: trace_end - trace_start,
    };
    debug!(
        spans = layout.spans.len(),
        roots = layout.roots.len(),
        total_duration = layout.total_duration,
        "trace layout computed"
    );
    layout
}

/// Sibling order: start ascending, duration descending, span id ascending,
/// then input position.
fn sibling_order(spans: &[RawSpan], a: usize, b: usize) -> Ordering {
    let (x, y) = (&spans[a], &spans[b]);
    x.timestamp
        .total_cmp(&y.timestamp)
        .then_with(|| y.duration.total_cmp(&x.duration))
        .then_with(|| x.span_id.cmp(&y.span_id))
        .then_with(|| a.cmp(&b))
}

/// Cut parent chains that never reach a root. For each cycle the first span
/// in sibling order is promoted to a root.
fn break_cycles(spans: &[RawSpan], parent_of: &mut [Option<usize>]) {
    let n = parent_of.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, parent) in parent_of.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(idx);
        }
    }

    let mut reached = vec![false; n];
    let natural_roots = (0..n).filter(|&idx| parent_of[idx].is_none()).collect();
    mark_reachable(&children, &mut reached, natural_roots);

    let mut stranded: Vec<usize> = (0..n).filter(|&idx| !reached[idx]).collect();
    if stranded.is_empty() {
        return;
    }
    stranded.sort_by(|a, b| sibling_order(spans, *a, *b));

    let mut promoted = 0usize;
    for start in stranded {
        if reached[start] {
            continue;
        }
        // An unreached span's ancestors are all unreached, so the chain must
        // close on itself.
        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut cursor = start;
        let cycle_start = loop {
            if let Some(&pos) = position.get(&cursor) {
                break pos;
            }
            position.insert(cursor, path.len());
            path.push(cursor);
            match parent_of[cursor] {
                Some(parent) => cursor = parent,
                None => break path.len() - 1,
            }
        };
        let Some(head) = path[cycle_start..]
            .iter()
            .copied()
            .min_by(|a, b| sibling_order(spans, *a, *b))
        else {
            continue;
        };
        parent_of[head] = None;
        promoted += 1;
        mark_reachable(&children, &mut reached, vec![head]);
    }
    debug!(promoted, "parent cycles broken by promoting spans to roots");
}

fn mark_reachable(children: &[Vec<usize>], reached: &mut [bool], mut stack: Vec<usize>) {
    while let Some(idx) = stack.pop() {
        if reached[idx] {
            continue;
        }
        reached[idx] = true;
        stack.extend(children[idx].iter().copied().filter(|&c| !reached[c]));
    }
}

fn time_bounds(spans: &[RawSpan]) -> (f64, f64) {
    let start = spans
        .iter()
        .map(|s| s.timestamp)
        .fold(f64::INFINITY, f64::min);
    let end = spans
        .iter()
        .map(|s| s.end_timestamp)
        .fold(f64::NEG_INFINITY, f64::max);

    let start = if start.is_finite() { start } else { 0.0 };
    let end = if end.is_finite() { end } else { start };
    if end - start >= 1.0 {
        (start, end)
    } else {
        (start, start + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>, ts: f64, duration: f64) -> RawSpan {
        RawSpan {
            trace_id: "t1".to_string(),
            span_id: id.to_string(),
            parent_span_id: parent.map(str::to_string),
            service_name: "api".to_string(),
            span_name: format!("op {id}"),
            timestamp: ts,
            end_timestamp: ts + duration,
            duration,
            status_code: "OK".to_string(),
            span_attributes: None,
            resource_attributes: None,
        }
    }

    fn ids(layout: &TraceLayout) -> Vec<&str> {
        layout.spans.iter().map(|s| s.span.span_id.as_str()).collect()
    }

    fn assert_invariants(input: &[RawSpan], layout: &TraceLayout) {
        assert_eq!(layout.spans.len(), input.len());
        for (row, span) in layout.spans.iter().enumerate() {
            assert_eq!(span.row_index, row);
            for &child in &span.children {
                let child = &layout.spans[child];
                assert!(child.row_index > span.row_index);
                assert_eq!(child.depth, span.depth + 1);
            }
        }
        for &root in &layout.roots {
            assert_eq!(layout.spans[root].depth, 0);
        }
        assert!(layout.total_duration >= 1.0);
    }

    #[test]
    fn single_span_is_root() {
        let input = vec![span("a", None, 100.0, 5.0)];
        let layout = compute_layout(&input);
        assert_eq!(layout.roots, vec![0]);
        assert_eq!(layout.spans.len(), 1);
        assert_eq!(layout.spans[0].depth, 0);
        assert_eq!(layout.spans[0].row_index, 0);
        assert_eq!(layout.trace_start, 100.0);
        assert_eq!(layout.total_duration, 5.0);
    }

    #[test]
    fn siblings_sorted_by_start_time_regardless_of_input_order() {
        let input = vec![
            span("root", None, 0.0, 20.0),
            span("late", Some("root"), 10.0, 1.0),
            span("early", Some("root"), 5.0, 1.0),
        ];
        let layout = compute_layout(&input);
        assert_eq!(ids(&layout), vec!["root", "early", "late"]);

        let mut reversed = input.clone();
        reversed.reverse();
        assert_eq!(ids(&compute_layout(&reversed)), vec!["root", "early", "late"]);
    }

    #[test]
    fn ties_break_on_duration_then_span_id() {
        let input = vec![
            span("c", None, 0.0, 5.0),
            span("b", None, 0.0, 5.0),
            span("a", None, 0.0, 1.0),
            span("z", None, 0.0, 9.0),
        ];
        let layout = compute_layout(&input);
        assert_eq!(ids(&layout), vec!["z", "b", "c", "a"]);
        assert_eq!(layout.roots, vec![0, 1, 2, 3]);
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let input = vec![
            span("root", None, 0.0, 10.0),
            span("orphan", Some("missing"), 2.0, 1.0),
        ];
        let layout = compute_layout(&input);
        let roots: Vec<&str> = layout.roots().map(|s| s.span.span_id.as_str()).collect();
        assert_eq!(roots, vec!["root", "orphan"]);
        assert_invariants(&input, &layout);
    }

    #[test]
    fn self_parent_becomes_root() {
        let input = vec![span("loop", Some("loop"), 0.0, 3.0)];
        let layout = compute_layout(&input);
        assert_eq!(layout.roots, vec![0]);
    }

    #[test]
    fn instantaneous_spans_get_unit_duration() {
        let input = vec![
            span("a", None, 42.0, 0.0),
            span("b", None, 42.0, 0.0),
            span("c", None, 42.0, 0.0),
        ];
        let layout = compute_layout(&input);
        assert_eq!(layout.total_duration, 1.0);
        assert_eq!(layout.trace_start, 42.0);
        assert_eq!(layout.trace_end, 43.0);
    }

    #[test]
    fn empty_input_yields_empty_layout() {
        let layout = compute_layout(&[]);
        assert!(layout.spans.is_empty());
        assert!(layout.roots.is_empty());
        assert_eq!(layout.total_duration, 0.0);
    }

    #[test]
    fn bounds_cover_children_that_outlive_parents() {
        let input = vec![
            span("root", None, 10.0, 5.0),
            span("skewed", Some("root"), 12.0, 30.0),
        ];
        let layout = compute_layout(&input);
        assert_eq!(layout.trace_start, 10.0);
        assert_eq!(layout.trace_end, 42.0);
        assert_eq!(layout.total_duration, 32.0);
    }

    #[test]
    fn depth_first_order_and_depths() {
        let input = vec![
            span("b1", Some("b"), 6.0, 1.0),
            span("a", Some("root"), 1.0, 2.0),
            span("root", None, 0.0, 10.0),
            span("b", Some("root"), 5.0, 3.0),
            span("a1", Some("a"), 1.5, 0.5),
        ];
        let layout = compute_layout(&input);
        assert_eq!(ids(&layout), vec!["root", "a", "a1", "b", "b1"]);
        let depths: Vec<usize> = layout.spans.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 2]);
        assert_eq!(layout.spans[0].children, vec![1, 3]);
        assert_invariants(&input, &layout);
    }

    #[test]
    fn duplicate_ids_keep_every_span_and_attach_to_last() {
        let input = vec![
            span("dup", None, 0.0, 4.0),
            span("dup", None, 1.0, 4.0),
            span("child", Some("dup"), 2.0, 1.0),
        ];
        let layout = compute_layout(&input);
        assert_eq!(layout.spans.len(), 3);
        let parent = layout.row(layout.spans[2].row_index - 1).unwrap();
        assert_eq!(parent.span.timestamp, 1.0);
        assert_eq!(layout.spans[2].span.span_id, "child");
        assert_invariants(&input, &layout);
    }

    #[test]
    fn parent_cycles_promote_one_member() {
        let input = vec![
            span("x", Some("z"), 3.0, 1.0),
            span("y", Some("x"), 2.0, 1.0),
            span("z", Some("y"), 1.0, 1.0),
            span("hanger", Some("x"), 0.0, 1.0),
        ];
        let layout = compute_layout(&input);
        assert_invariants(&input, &layout);
        assert_eq!(layout.roots.len(), 1);
        assert_eq!(layout.spans[layout.roots[0]].span.span_id, "z");
        assert_eq!(ids(&layout), vec!["z", "x", "hanger", "y"]);
    }

    #[test]
    fn error_flag_follows_status() {
        let mut failed = span("a", None, 0.0, 1.0);
        failed.status_code = "ERROR".to_string();
        let mut legacy = span("b", None, 1.0, 1.0);
        legacy.status_code = "2".to_string();
        let layout = compute_layout(&[failed, legacy, span("c", None, 2.0, 1.0)]);
        let flags: Vec<bool> = layout.spans.iter().map(|s| s.is_error).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(layout.error_count(), 2);
    }

    #[test]
    fn generated_forests_hold_invariants() {
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for round in 0..25 {
            let count = 1 + (next() % 60) as usize;
            let mut input = Vec::with_capacity(count);
            for i in 0..count {
                let parent = match next() % 4 {
                    0 => None,
                    1 => Some("ghost".to_string()),
                    _ => Some(format!("s{}", next() % count as u64)),
                };
                let ts = (next() % 50) as f64;
                let duration = (next() % 20) as f64;
                let mut raw = span(&format!("s{i}"), None, ts, duration);
                raw.parent_span_id = parent;
                input.push(raw);
            }
            let layout = compute_layout(&input);
            assert_invariants(&input, &layout);

            let mut rows: Vec<usize> = layout.spans.iter().map(|s| s.row_index).collect();
            rows.sort_unstable();
            assert_eq!(rows, (0..count).collect::<Vec<_>>(), "round {round}");

            for siblings in layout
                .spans
                .iter()
                .map(|s| s.children.clone())
                .chain(std::iter::once(layout.roots.clone()))
            {
                for pair in siblings.windows(2) {
                    let (a, b) = (&layout.spans[pair[0]].span, &layout.spans[pair[1]].span);
                    let ordered = a.timestamp < b.timestamp
                        || (a.timestamp == b.timestamp && a.duration > b.duration)
                        || (a.timestamp == b.timestamp
                            && a.duration == b.duration
                            && a.span_id <= b.span_id);
                    assert!(ordered, "round {round}: {} before {}", a.span_id, b.span_id);
                }
            }
        }
    }
}
