use colored::*;
use terminal_size::{Width, Height, terminal_size};

use crate::search::{ComparisonResult, FlightOffer};

fn rule() -> String {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    "─".repeat(width.0 as usize)
}

pub fn print_header(model: &str, provider: &str) {
    let line = rule();
    println!("{}", line.black().bold());

    let logo = "✈️";
    let name = "Flight Agent".cyan().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();

    println!("  {} {} {}", logo, name, version);

    let info = format!("  {}  •  {}", model, provider).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// One table row for an offer.
pub fn offer_line(rank: usize, offer: &FlightOffer) -> String {
    let stops = match offer.stops {
        0 => "nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    };
    let departure = offer
        .departure
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string());

    format!(
        "{:>2}. {:>12}  {:>7}  {:<8}  {}  {}  [{}]",
        rank,
        offer.price.to_string(),
        offer.duration_label(),
        stops,
        departure,
        offer.airline,
        offer.provider
    )
}

fn highlight(label: &str, offer: &FlightOffer) -> String {
    format!(
        "{}: {} {} ({}, {})",
        label,
        offer.airline,
        offer.price,
        offer.duration_label(),
        offer.provider
    )
}

/// Print a comparison: summary, ranked offers, then provider failures.
pub fn print_comparison(result: &ComparisonResult, limit: usize) {
    println!("\n  {}", result.summary.bold());
    println!("{}", rule().black().bold());

    for (i, offer) in result.offers.iter().take(limit).enumerate() {
        let line = offer_line(i + 1, offer);
        if i == 0 {
            println!("  {}", line.green().bold());
        } else {
            println!("  {}", line);
        }
    }
    if result.offers.len() > limit {
        println!("  {}", format!("... and {} more", result.offers.len() - limit).black().bold());
    }

    if let Some(cheapest) = result.cheapest() {
        print_step(&highlight("Cheapest", cheapest));
    }
    if let Some(fastest) = result.fastest() {
        print_step(&highlight("Fastest", fastest));
    }
    if result.mixed_currency {
        print_warning("Offers came back in more than one currency; prices are not converted.");
    }
    for failure in &result.failures {
        print_warning(&failure.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{fixtures::offer, ProviderId};

    #[test]
    fn test_offer_line() {
        let line = offer_line(1, &offer(ProviderId::GoogleFlights, 420.0, 450));
        assert!(line.contains("420.00 USD"));
        assert!(line.contains("7h 30m"));
        assert!(line.contains("nonstop"));
        assert!(line.contains("[Google Flights]"));
    }

    #[test]
    fn test_highlight() {
        let text = highlight("Cheapest", &offer(ProviderId::SkyScrapper, 389.0, 560));
        assert!(text.starts_with("Cheapest: "));
        assert!(text.contains("389.00 USD"));
        assert!(text.contains("9h 20m, Sky Scrapper"));
    }

    #[test]
    fn test_offer_line_stops() {
        let mut connecting = offer(ProviderId::SkyScrapper, 389.0, 560);
        connecting.stops = 2;
        assert!(offer_line(3, &connecting).contains("2 stops"));
    }
}
