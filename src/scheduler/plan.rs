use std::collections::HashSet;

/// The reference/model slice assigned to one [`super::packet::ComputePacket`].
#[derive(Debug, Clone, PartialEq)]
pub struct PacketPlan {
    pub label: String,
    pub references: HashSet<String>,
    pub models: HashSet<String>,
}

/// Partition `references x models` into packets, each covering at most
/// `partition_size` references and `partition_size` models, such that
/// the union of packets covers every reference/model combination exactly
/// once.
///
/// References are chunked into `ceil(n_refs / partition_size)` groups and
/// models into `ceil(n_models / partition_size)` groups; one packet is
/// created per (reference chunk, model chunk) pair, i.e. their cross
/// product.
pub fn plan(references: &[String], models: &[String], partition_size: usize) -> Vec<PacketPlan> {
    if references.is_empty() || models.is_empty() {
        return Vec::new();
    }

    let n_ref_groups = references.len().div_ceil(partition_size);
    let n_model_groups = models.len().div_ceil(partition_size);
    let n_packets = n_ref_groups * n_model_groups;

    let mut ref_groups: Vec<HashSet<String>> = (0..n_packets).map(|_| HashSet::new()).collect();
    let mut model_groups: Vec<HashSet<String>> = (0..n_packets).map(|_| HashSet::new()).collect();

    for (i, reference) in references.iter().enumerate() {
        let zi = (i / partition_size) * n_model_groups;
        for zj in 0..n_model_groups {
            ref_groups[zi + zj].insert(reference.clone());
        }
    }
    for (j, model) in models.iter().enumerate() {
        let zj = j / partition_size;
        for zi in 0..n_ref_groups {
            model_groups[(zi * n_model_groups) + zj].insert(model.clone());
        }
    }

    (0..n_packets)
        .map(|z| PacketPlan {
            label: format!("packet-{z}"),
            references: std::mem::take(&mut ref_groups[z]),
            models: std::mem::take(&mut model_groups[z]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn empty_inputs_produce_no_packets() {
        assert!(plan(&[], &names(3, "m"), 4).is_empty());
        assert!(plan(&names(3, "r"), &[], 4).is_empty());
    }

    #[test]
    fn packet_count_matches_cross_product_of_chunk_counts() {
        let refs = names(10, "r");
        let models = names(25, "m");
        let packets = plan(&refs, &models, 4);
        // ceil(10/4)=3 ref groups, ceil(25/4)=7 model groups -> 21 packets
        assert_eq!(packets.len(), 21);
    }

    #[test]
    fn every_combination_is_covered_exactly_once() {
        let refs = names(5, "r");
        let models = names(5, "m");
        let packets = plan(&refs, &models, 2);

        let mut coverage: HashSet<(String, String)> = HashSet::new();
        for packet in &packets {
            for r in &packet.references {
                for m in &packet.models {
                    assert!(
                        coverage.insert((r.clone(), m.clone())),
                        "combination ({r}, {m}) covered more than once"
                    );
                }
            }
        }
        assert_eq!(coverage.len(), refs.len() * models.len());
    }

    #[test]
    fn single_partition_yields_one_packet_covering_everything() {
        let refs = names(3, "r");
        let models = names(3, "m");
        let packets = plan(&refs, &models, 512);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].references.len(), 3);
        assert_eq!(packets[0].models.len(), 3);
    }
}
