//! Port and Channel Resolution
//!
//! Pure functions deriving port bindings and inferring channels between
//! ports that share a binding at one nesting level.
//!
//! Channels are inferred once per parent scope, when it closes. The
//! participants are the parent's own ports and the boundary ports of its
//! direct children:
//!
//! - a child's Out/Return feeds another child's In/Param
//! - the parent's In feeds a child's In, and the parent's Param feeds a
//!   child's Param (inward pass-through)
//! - the parent's Out/Return feeds a child's In/Param
//! - a child's Out/Return feeds the parent's Out/Return (outward pass-through)
//!
//! A channel is a param channel when its sink is a Param port. Fan-in and
//! fan-out are both legal, so every matching pair yields a channel.

use log::debug;

use super::types::{Channel, Port};
use crate::annotations::Qualification;

/// Resolves the binding for a declared port name.
///
/// # Example
///
/// ```
/// use yesworkflow::annotations::Qualification;
/// use yesworkflow::model::resolver::resolve_binding;
///
/// let plain = Qualification::default();
/// assert_eq!(resolve_binding("reads", &plain), "reads");
///
/// let aliased = Qualification { alias: Some("samples".to_string()) };
/// assert_eq!(resolve_binding("reads", &aliased), "samples");
/// ```
pub fn resolve_binding(raw_name: &str, qualification: &Qualification) -> String {
    match &qualification.alias {
        Some(alias) => alias.clone(),
        None => raw_name.to_string(),
    }
}

fn link(source: &Port, sink: &Port) -> Option<Channel> {
    (source.binding == sink.binding).then(|| Channel {
        source: source.clone(),
        sink: sink.clone(),
        is_param: sink.kind.is_param(),
    })
}

/// Infers the channels of one parent scope.
///
/// * `own_in` - the parent's In and Param ports
/// * `own_out` - the parent's Out and Return ports
/// * `nested` - boundary ports of the parent's direct children, in
///   declaration order
pub fn infer_channels(own_in: &[Port], own_out: &[Port], nested: &[Port]) -> Vec<Channel> {
    let mut channels = Vec::new();

    for sink in nested.iter().filter(|p| p.kind.is_consumer()) {
        // Param and data inputs only forward to their own kind.
        let forwarded = own_in
            .iter()
            .filter(|p| p.kind.is_param() == sink.kind.is_param());

        let siblings = nested
            .iter()
            .filter(|p| p.kind.is_producer() && p.scope != sink.scope);

        channels.extend(
            forwarded
                .chain(own_out.iter())
                .chain(siblings)
                .filter_map(|source| link(source, sink)),
        );
    }

    for sink in own_out {
        channels.extend(
            nested
                .iter()
                .filter(|p| p.kind.is_producer())
                .filter_map(|source| link(source, sink)),
        );
    }

    debug!(
        "Inferred {} channels from {} own and {} nested ports",
        channels.len(),
        own_in.len() + own_out.len(),
        nested.len()
    );

    channels
}
