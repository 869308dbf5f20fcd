//! `manifold kinds`: print the apply-order ranking.

use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

use manifold_engine::apply_order::{rank, KIND_ORDER, LAST_KINDS, UNKNOWN_RANK};

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "rank")]
    rank: usize,
    #[tabled(rename = "kind")]
    kind: String,
}

pub fn run() -> Result<()> {
    let mut rows: Vec<KindRow> = KIND_ORDER
        .iter()
        .map(|kind| KindRow {
            rank: rank(kind),
            kind: (*kind).to_string(),
        })
        .collect();
    rows.push(KindRow {
        rank: UNKNOWN_RANK,
        kind: "(any other kind)".to_string(),
    });
    rows.extend(LAST_KINDS.iter().map(|kind| KindRow {
        rank: rank(kind),
        kind: (*kind).to_string(),
    }));

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
