use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::risk_profile::RiskProfile;
use crate::sensitivity::SweepResult;
use crate::tree::DecisionTree;

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => String::new(),
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// One row per tree node with its tags and rollback results. Nodes on the
/// optimal strategy are highlighted.
pub fn tree_table(tree: &DecisionTree) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let has_utility = tree.nodes().iter().any(|n| n.eu.is_some());
    let mut header = vec![
        Cell::new("#"),
        Cell::new("Node"),
        Cell::new("Type"),
        Cell::new("Branch"),
        Cell::new("Value").set_alignment(CellAlignment::Right),
        Cell::new("Prob").set_alignment(CellAlignment::Right),
        Cell::new("EV").set_alignment(CellAlignment::Right),
    ];
    if has_utility {
        header.push(Cell::new("EU").set_alignment(CellAlignment::Right));
        header.push(Cell::new("CE").set_alignment(CellAlignment::Right));
    }
    header.push(Cell::new("PathProb").set_alignment(CellAlignment::Right));
    header.push(Cell::new("Next"));
    table.set_header(header);

    for (idx, node) in tree.nodes().iter().enumerate() {
        let name = if node.optimal_strategy {
            node.name.green().bold().to_string()
        } else {
            node.name.dimmed().to_string()
        };
        let branch = match (node.tag_name(), node.tag_branch()) {
            (Some(var), Some(label)) => format!("{}={}", var, label),
            _ => String::new(),
        };
        let next = match node.optimal_successor() {
            Some(s) if node.forced_branch().is_some() => format!("{} (forced)", s),
            Some(s) => s.to_string(),
            None => node
                .successors()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        };

        let mut row = vec![
            Cell::new(idx),
            Cell::new(name),
            Cell::new(node.kind_str()),
            Cell::new(branch),
            right(fmt_opt(node.tag_value(), 2)),
            right(fmt_opt(node.tag_prob(), 4)),
            right(fmt_opt(node.ev, 2)),
        ];
        if has_utility {
            row.push(right(fmt_opt(node.eu, 4)));
            row.push(right(fmt_opt(node.ce, 2)));
        }
        row.push(right(fmt_opt(node.path_prob, 4)));
        row.push(Cell::new(next));
        table.add_row(row);
    }

    table.to_string()
}

/// Sweep series side by side, one row per grid point.
pub fn series_table(x_label: &str, result: &SweepResult) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let series = result.series();
    let mut header = vec![Cell::new(x_label).set_alignment(CellAlignment::Right)];
    for s in series {
        header.push(Cell::new(s.label.bold().to_string()).set_alignment(CellAlignment::Right));
    }
    table.set_header(header);

    let n_points = series.first().map_or(0, |s| s.len());
    for i in 0..n_points {
        let mut row = vec![right(format!("{:.4}", series[0].points[i].0))];
        for s in series {
            row.push(right(format!("{:.2}", s.points[i].1)));
        }
        table.add_row(row);
    }

    table.to_string()
}

pub fn profile_table(profile: &RiskProfile, cumulative: bool) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("Value").set_alignment(CellAlignment::Right),
        Cell::new("Probability").set_alignment(CellAlignment::Right),
    ];
    if cumulative {
        header.push(Cell::new("Cumulative").set_alignment(CellAlignment::Right));
    }
    table.set_header(header);

    for r in &profile.rows {
        let mut row = vec![right(format!("{:.2}", r.value)), right(format!("{:.4}", r.probability))];
        if cumulative {
            row.push(right(format!("{:.4}", r.cumulative)));
        }
        table.add_row(row);
    }

    format!("  {}\n{}", profile.label.bold(), table)
}

pub fn styled_value(label: &str, value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = if value >= 0.0 { text.green().bold() } else { text.red().bold() };
    format!("{} {}", label.bold(), text)
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeSpecBag;
    use crate::payoff::CumulativePayoff;
    use crate::sensitivity::Series;

    #[test]
    fn tree_table_lists_every_node() {
        let mut bag = NodeSpecBag::new();
        bag.add_decision("d", [("go", 3.0, "end"), ("stop", 1.0, "end")], true)
            .unwrap();
        bag.add_terminal("end", CumulativePayoff).unwrap();
        let mut tree = DecisionTree::new(&bag).unwrap();
        tree.evaluate().unwrap();
        tree.rollback_ev().unwrap();

        let out = tree_table(&tree);
        assert!(out.contains("d=go"));
        assert!(out.contains("d=stop"));
        assert!(out.contains("3.00"));
        assert!(!out.contains("CE"));
    }

    #[test]
    fn series_table_has_row_per_point() {
        let result = SweepResult::PerBranch(vec![
            Series {
                label: "a".to_string(),
                points: vec![(0.0, 1.0), (1.0, 2.0)],
            },
            Series {
                label: "b".to_string(),
                points: vec![(0.0, 5.0), (1.0, 6.0)],
            },
        ]);
        let out = series_table("Probability", &result);
        assert!(out.contains("Probability"));
        assert!(out.contains("6.00"));
        assert!(out.contains("1.0000"));
    }
}
