//! Helpers shared by the connectors.

use super::error::{Result, RouteError};
use crate::layout::port::{Domain, Port};
use crate::layout::trace::TraceTemplate;
use crate::log::warn;

/// Checks that both ports can be joined by a waveguide.
pub fn check_domains(start: &Port, end: &Port) -> Result<()> {
    match (start.domain(), end.domain()) {
        (Domain::Optical, Domain::Optical) => Ok(()),
        (a, b) => Err(RouteError::IncompatibleDomains(a, b)),
    }
}

/// Picks the trace template of a connector.
///
/// The start port's template wins, then the end port's, then `fallback`.
/// A core width that differs from either port is reported but not rejected.
pub fn choose_template(start: &Port, end: &Port, fallback: &TraceTemplate) -> TraceTemplate {
    let template = start
        .trace_template()
        .or_else(|| end.trace_template())
        .unwrap_or(fallback)
        .clone();
    for port in [start, end] {
        if let Some(width) = port.core_width() {
            if width != template.core_width {
                warn!(
                    "a waveguide core of width {} may not match at {}",
                    template.core_width,
                    port.position()
                );
            }
        }
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_template_wins() {
        let narrow = TraceTemplate::default().with_core_width(0.4);
        let start = Port::optical("a", (0., 0.), 0., narrow.clone());
        let end = Port::optical("b", (10., 0.), 180., TraceTemplate::default());
        assert_eq!(
            choose_template(&start, &end, &TraceTemplate::default()),
            narrow
        );
    }

    #[test]
    fn electrical_ports_are_rejected() {
        let start = Port::electrical("a", (0., 0.), 0.);
        let end = Port::optical("b", (10., 0.), 180., TraceTemplate::default());
        assert!(matches!(
            check_domains(&start, &end),
            Err(RouteError::IncompatibleDomains(
                Domain::Electrical,
                Domain::Optical
            ))
        ));
    }
}
