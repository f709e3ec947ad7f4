use serde_json::Value;

use agora_types::notifications::ChainEventLabel;

/// Render a chain event into its display label, keyed on the chain's
/// protocol family. Unknown kinds fall back to a generic label rather than
/// failing; a notification must always be renderable.
pub fn label_event(network: &str, chain_id: &str, data: &Value) -> ChainEventLabel {
    let kind = data.get("kind").and_then(Value::as_str).unwrap_or("unknown");

    match network {
        "substrate" => substrate_label(chain_id, kind, data),
        "moloch" => moloch_label(chain_id, kind, data),
        "compound" => compound_label(chain_id, kind, data),
        "aave" => aave_label(chain_id, kind, data),
        _ => generic_label(chain_id, kind),
    }
}

fn substrate_label(chain_id: &str, kind: &str, data: &Value) -> ChainEventLabel {
    match kind {
        "democracy-proposed" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "New Democracy Proposal".into(),
                label: format!("Democracy proposal {} was introduced on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/democracyproposal/{}", chain_id, index)),
            }
        }
        "democracy-started" => {
            let index = num(data, "referendumIndex");
            ChainEventLabel {
                heading: "Referendum Started".into(),
                label: format!("Referendum {} has started voting on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/referendum/{}", chain_id, index)),
            }
        }
        "democracy-passed" => {
            let index = num(data, "referendumIndex");
            ChainEventLabel {
                heading: "Referendum Passed".into(),
                label: format!("Referendum {} has passed on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/referendum/{}", chain_id, index)),
            }
        }
        "democracy-not-passed" => {
            let index = num(data, "referendumIndex");
            ChainEventLabel {
                heading: "Referendum Failed".into(),
                label: format!("Referendum {} has failed on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/referendum/{}", chain_id, index)),
            }
        }
        "democracy-executed" => {
            let index = num(data, "referendumIndex");
            ChainEventLabel {
                heading: "Referendum Executed".into(),
                label: format!("Referendum {} was executed on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/referendum/{}", chain_id, index)),
            }
        }
        "treasury-proposed" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "New Treasury Proposal".into(),
                label: format!("Treasury proposal {} was introduced on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/treasuryproposal/{}", chain_id, index)),
            }
        }
        "treasury-awarded" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "Treasury Proposal Awarded".into(),
                label: format!("Treasury proposal {} was awarded on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/treasuryproposal/{}", chain_id, index)),
            }
        }
        "reward" => ChainEventLabel {
            heading: "Validator Reward".into(),
            label: format!("A reward of {} was paid out on {}", str_field(data, "amount"), chain_id),
            link_path: None,
        },
        "slash" => ChainEventLabel {
            heading: "Validator Slash".into(),
            label: format!(
                "Validator {} was slashed {} on {}",
                str_field(data, "validator"),
                str_field(data, "amount"),
                chain_id
            ),
            link_path: None,
        },
        "bonded" => ChainEventLabel {
            heading: "Bonded".into(),
            label: format!(
                "{} bonded {} on {}",
                str_field(data, "stash"),
                str_field(data, "amount"),
                chain_id
            ),
            link_path: None,
        },
        "unbonded" => ChainEventLabel {
            heading: "Unbonded".into(),
            label: format!(
                "{} unbonded {} on {}",
                str_field(data, "stash"),
                str_field(data, "amount"),
                chain_id
            ),
            link_path: None,
        },
        _ => generic_label(chain_id, kind),
    }
}

fn moloch_label(chain_id: &str, kind: &str, data: &Value) -> ChainEventLabel {
    match kind {
        "submit-proposal" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "New Moloch Proposal".into(),
                label: format!("Proposal {} was submitted on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/molochproposal/{}", chain_id, index)),
            }
        }
        "submit-vote" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "Moloch Vote Cast".into(),
                label: format!("A vote was cast on proposal {} on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/molochproposal/{}", chain_id, index)),
            }
        }
        "process-proposal" => {
            let index = num(data, "proposalIndex");
            ChainEventLabel {
                heading: "Moloch Proposal Processed".into(),
                label: format!("Proposal {} was processed on {}", index, chain_id),
                link_path: Some(format!("/{}/proposal/molochproposal/{}", chain_id, index)),
            }
        }
        "ragequit" => ChainEventLabel {
            heading: "Member Ragequit".into(),
            label: format!("{} ragequit on {}", str_field(data, "member"), chain_id),
            link_path: None,
        },
        _ => generic_label(chain_id, kind),
    }
}

fn compound_label(chain_id: &str, kind: &str, data: &Value) -> ChainEventLabel {
    match kind {
        "proposal-created" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "New Governance Proposal".into(),
                label: format!("Proposal {} was created on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/compoundproposal/{}", chain_id, id)),
            }
        }
        "proposal-queued" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Proposal Queued".into(),
                label: format!("Proposal {} was queued on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/compoundproposal/{}", chain_id, id)),
            }
        }
        "proposal-executed" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Proposal Executed".into(),
                label: format!("Proposal {} was executed on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/compoundproposal/{}", chain_id, id)),
            }
        }
        "proposal-canceled" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Proposal Canceled".into(),
                label: format!("Proposal {} was canceled on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/compoundproposal/{}", chain_id, id)),
            }
        }
        "vote-cast" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Vote Cast".into(),
                label: format!("A vote was cast on proposal {} on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/compoundproposal/{}", chain_id, id)),
            }
        }
        _ => generic_label(chain_id, kind),
    }
}

fn aave_label(chain_id: &str, kind: &str, data: &Value) -> ChainEventLabel {
    match kind {
        "proposal-created" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "New Aave Proposal".into(),
                label: format!("Proposal {} was created on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/aaveproposal/{}", chain_id, id)),
            }
        }
        "vote-emitted" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Vote Emitted".into(),
                label: format!("A vote was emitted on proposal {} on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/aaveproposal/{}", chain_id, id)),
            }
        }
        "proposal-queued" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Proposal Queued".into(),
                label: format!("Proposal {} was queued on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/aaveproposal/{}", chain_id, id)),
            }
        }
        "proposal-executed" => {
            let id = num(data, "id");
            ChainEventLabel {
                heading: "Proposal Executed".into(),
                label: format!("Proposal {} was executed on {}", id, chain_id),
                link_path: Some(format!("/{}/proposal/aaveproposal/{}", chain_id, id)),
            }
        }
        _ => generic_label(chain_id, kind),
    }
}

fn generic_label(chain_id: &str, kind: &str) -> ChainEventLabel {
    ChainEventLabel {
        heading: "Chain Event".into(),
        label: format!("{} event on {}", kind, chain_id),
        link_path: None,
    }
}

fn num(data: &Value, field: &str) -> u64 {
    data.get(field).and_then(Value::as_u64).unwrap_or(0)
}

fn str_field(data: &Value, field: &str) -> String {
    data.get(field)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substrate_referendum_started() {
        let data = json!({"kind": "democracy-started", "referendumIndex": 3});
        let label = label_event("substrate", "edgeware", &data);
        assert_eq!(label.heading, "Referendum Started");
        assert_eq!(label.label, "Referendum 3 has started voting on edgeware");
        assert_eq!(
            label.link_path.as_deref(),
            Some("/edgeware/proposal/referendum/3")
        );
    }

    #[test]
    fn moloch_submit_proposal() {
        let data = json!({"kind": "submit-proposal", "proposalIndex": 12});
        let label = label_event("moloch", "moloch", &data);
        assert_eq!(label.heading, "New Moloch Proposal");
        assert!(label.label.contains("Proposal 12"));
    }

    #[test]
    fn unknown_kind_falls_back() {
        let data = json!({"kind": "some-new-event"});
        let label = label_event("substrate", "edgeware", &data);
        assert_eq!(label.heading, "Chain Event");
        assert_eq!(label.label, "some-new-event event on edgeware");
        assert!(label.link_path.is_none());
    }

    #[test]
    fn unknown_network_falls_back() {
        let data = json!({"kind": "proposal-created", "id": 1});
        let label = label_event("cosmos", "osmosis", &data);
        assert_eq!(label.heading, "Chain Event");
    }

    #[test]
    fn missing_fields_do_not_panic() {
        let label = label_event("substrate", "edgeware", &json!({}));
        assert_eq!(label.heading, "Chain Event");
        let label = label_event("compound", "marlin", &json!({"kind": "vote-cast"}));
        assert!(label.label.contains("proposal 0"));
    }
}
