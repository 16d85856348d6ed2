use crate::domain::report::{display_date, LayoutKind, MarketDataBag};
use chrono::NaiveDate;

const DASHBOARD_RULES: &str = "\
You are a professional front-end engineer and financial designer.
Fill the MARKET DATA below into the attached HTML TEMPLATE and produce one complete market report.

Requirements:
1. Keep the template intact: do not change its CSS, structure or class names.
2. Copy index values, percentage changes and news text into the matching blocks.
   For the movers and sector blocks, emit exactly one card or row per provided item
   (for example six gaining stocks means six `.mover-card` elements).
3. Colour rules for every change value (indices, bonds, sectors, stocks):
   - value > 0: use the `text-green` class with `<i class=\"fa-solid fa-caret-up\"></i>`;
     set any card background or border to `up` or `bg-green-soft`.
   - value < 0: use the `text-red` class with `<i class=\"fa-solid fa-caret-down\"></i>`;
     set any card background or border to `down` or `bg-red-soft`.
   - value = 0: keep the neutral colour.
4. Replace the template date with {date}.
5. Output HTML only: the full <html>...</html> document, no explanation.";

const EMAIL_RULES: &str = "\
You are a professional email marketer and front-end engineer.
Fill the MARKET DATA below into the attached EMAIL TEMPLATE.

Requirements:
1. The template uses table layout for mail-client compatibility. Do not change its structure
   (`<table>`, `<tr>`, `<td>`); only fill the marked places or duplicate `<tr>` rows.
2. Content placement:
   - Indices go in `.indices-table`, one `<tr style=\"border-bottom: 1px solid #eee;\">` per index
     with three cells of width 50% / 25% / 25%: name (left), value (right), change (right, bold).
   - Sectors go in `.sector-strong` (gainers) and `.sector-weak` (losers) with the same three-cell rows.
   - Treasury yields go in `.treasury-row` with the same 50% / 25% / 25% cells.
   - Each mover is one `<tr>` in `.movers-table`, including its news summary.
   - Recap points go in `.recap-list` as `<li>` items.
3. Keep every inline `style=\"...\"` attribute. Positive values get `color: #00c853;`,
   negative values get `color: #ff1744;`, zero stays neutral.
4. Replace the template date with {date}.
5. Output HTML only.";

/// Full generation prompt: layout rules, the data bag, then the template verbatim.
pub fn build_prompt(
    layout: LayoutKind,
    target_date: NaiveDate,
    bag: &MarketDataBag,
    template: &str,
) -> String {
    let rules = match layout {
        LayoutKind::Dashboard => DASHBOARD_RULES,
        LayoutKind::Email => EMAIL_RULES,
    }
    .replace("{date}", &display_date(target_date));

    let mut out = String::with_capacity(template.len() + 4096);
    out.push_str(&rules);
    out.push_str("\n\n### MARKET DATA\n\n");

    out.push_str("**1. Indices & sectors:**\n");
    if bag.index_lines.is_empty() {
        out.push_str("N/A\n");
    } else {
        out.push_str(&bag.index_lines.join("\n"));
        out.push('\n');
    }

    out.push_str("\n**2. Treasury yields:**\n");
    match &bag.rate_view {
        Some(view) => out.push_str(&pretty(&view.to_json())),
        None => out.push_str("N/A"),
    }

    out.push_str("\n\n**3. Market recap:**\n");
    out.push_str(&pretty(&bag.recap_points));

    out.push_str("\n\n**4. Biggest movers:**\n");
    out.push_str(&pretty(&bag.movers));

    out.push_str("\n\n**5. Mover news summaries:**\n");
    out.push_str(&pretty(&bag.symbol_summaries));

    if !bag.trending_summaries.is_empty() {
        out.push_str("\n\n**6. Most discussed symbols:**\n");
        out.push_str(&pretty(&bag.trending_summaries));
    }

    let label = match layout {
        LayoutKind::Dashboard => "HTML TEMPLATE",
        LayoutKind::Email => "EMAIL TEMPLATE",
    };
    out.push_str(&format!("\n\n### {label}\n{template}\n"));
    out
}

fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "N/A".to_string())
}
