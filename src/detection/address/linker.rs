//! Proximity-based address linking

use crate::detection::config::AddressConfig;
use crate::detection::detector::resolve_overlaps;
use crate::domain::{
    AddressBreakdown, AddressComponent, AddressPattern, ComponentKind, Entity, EntityType,
    GroupedAddress,
};

use ComponentKind::{City, Country, PostalCode, StreetName, StreetNumber};

const PRIMARY: &[ComponentKind] = &[StreetName, StreetNumber, PostalCode, City];
const INTERNATIONAL: &[ComponentKind] = &[StreetName, StreetNumber, PostalCode, City, Country];
const ALTERNATE: &[ComponentKind] = &[PostalCode, City, StreetName, StreetNumber];
const ALTERNATE_INTERNATIONAL: &[ComponentKind] =
    &[PostalCode, City, StreetName, StreetNumber, Country];

/// Templates a partial group may be an ordered subset of
const TEMPLATES: &[&[ComponentKind]] = &[INTERNATIONAL, ALTERNATE_INTERNATIONAL];

/// Result of linking: grouped addresses and the remaining entities
#[derive(Debug, Default)]
pub struct LinkedEntities {
    /// Entities not absorbed into any address, in document order
    pub standalone: Vec<Entity>,
    /// Grouped addresses, unscored, in document order
    pub addresses: Vec<GroupedAddress>,
}

/// Groups address components that sit close together
#[derive(Debug, Clone, Copy)]
pub struct AddressLinker {
    proximity_threshold: usize,
    multiline_threshold: usize,
}

impl AddressLinker {
    /// Create a linker from configuration
    pub fn new(config: &AddressConfig) -> Self {
        Self {
            proximity_threshold: config.proximity_threshold,
            multiline_threshold: config.multiline_threshold.max(config.proximity_threshold),
        }
    }

    /// Split components into proximity groups
    ///
    /// A new group starts when the gap since the previous component exceeds
    /// the proximity threshold, or the wider multi-line threshold when the
    /// gap contains a line break. A component kind repeating across a line
    /// break also starts a new group, so stacked address blocks separate.
    pub fn group_by_proximity(
        &self,
        mut components: Vec<AddressComponent>,
        text: &str,
    ) -> Vec<Vec<AddressComponent>> {
        components.sort_by_key(|c| (c.start(), c.end()));

        let mut groups: Vec<Vec<AddressComponent>> = Vec::new();
        let mut current: Vec<AddressComponent> = Vec::new();
        let mut current_end = 0usize;

        for component in components {
            if let Some(previous) = current.last() {
                let gap = component.start().saturating_sub(current_end);
                let multiline = text
                    .get(current_end.min(component.start())..component.start())
                    .is_some_and(|between| between.contains('\n'));
                let threshold = if multiline {
                    self.multiline_threshold
                } else {
                    self.proximity_threshold
                };
                let repeated = multiline && current.iter().any(|c| c.kind == component.kind);

                if gap > threshold || repeated {
                    tracing::trace!(
                        gap,
                        multiline,
                        repeated,
                        previous_end = previous.end(),
                        "Address group boundary"
                    );
                    groups.push(std::mem::take(&mut current));
                    current_end = 0;
                }
            }
            current_end = current_end.max(component.end());
            current.push(component);
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    /// Match the group's field order against the address templates
    pub fn detect_pattern(group: &[AddressComponent]) -> AddressPattern {
        let kinds: Vec<ComponentKind> = group.iter().map(|c| c.kind).collect();

        if kinds == PRIMARY {
            return AddressPattern::Primary;
        }
        if kinds == INTERNATIONAL {
            return AddressPattern::International;
        }
        if kinds == ALTERNATE || kinds == ALTERNATE_INTERNATIONAL {
            return AddressPattern::Alternate;
        }
        if kinds.len() >= 2
            && TEMPLATES
                .iter()
                .any(|template| is_ordered_subset(&kinds, template))
        {
            return AddressPattern::Partial;
        }
        AddressPattern::None
    }

    /// Build a grouped address from a non-empty group
    ///
    /// Every component is marked linked. Returns `None` for an empty group.
    pub fn create_grouped_address(
        mut group: Vec<AddressComponent>,
        pattern: AddressPattern,
        text: &str,
    ) -> Option<GroupedAddress> {
        let start = group.first()?.start();
        let end = group.iter().map(AddressComponent::end).max()?;
        for component in &mut group {
            component.entity.mark_linked();
        }
        let covered = text.get(start..end).map(str::to_string).unwrap_or_else(|| {
            group
                .iter()
                .map(|c| c.entity.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });

        Some(GroupedAddress {
            id: uuid::Uuid::new_v4().to_string(),
            components: group,
            pattern,
            breakdown: AddressBreakdown::default(),
            start,
            end,
            text: covered,
            confidence: 0.0,
            flagged_for_review: false,
            auto_anonymize: false,
        })
    }

    /// Link address components in `entities` into grouped addresses
    ///
    /// Components that end up in a group are removed from the standalone
    /// set. Place entities lying inside a grouped address (a model `LOC`
    /// on the city part of a street name) are absorbed as well. Groups
    /// that match no template give their components back as standalone
    /// entities.
    ///
    /// The returned spans never overlap: a recipient block keeps only its
    /// lines above the address and takes in the names it contains, and
    /// any remaining overlap goes to the longer span.
    pub fn link(&self, entities: Vec<Entity>, text: &str) -> LinkedEntities {
        let (components, mut standalone): (Vec<Entity>, Vec<Entity>) = entities
            .into_iter()
            .partition(|e| e.entity_type.is_address_component());
        let components: Vec<AddressComponent> = components
            .into_iter()
            .filter_map(|e| AddressComponent::try_from(e).ok())
            .collect();

        let mut addresses = Vec::new();
        for group in self.group_by_proximity(components, text) {
            let pattern = Self::detect_pattern(&group);
            if pattern == AddressPattern::None {
                standalone.extend(group.into_iter().map(|c| c.entity));
                continue;
            }
            if let Some(address) = Self::create_grouped_address(group, pattern, text) {
                addresses.push(address);
            }
        }

        let before = standalone.len();
        standalone.retain(|entity| {
            !(is_place(entity.entity_type)
                && addresses
                    .iter()
                    .any(|a: &GroupedAddress| a.start <= entity.start() && entity.end() <= a.end))
        });
        let absorbed = before - standalone.len();

        let (standalone, displaced) = clear_address_spans(standalone, &addresses, text);
        let standalone = resolve_overlaps(fold_into_blocks(standalone));
        tracing::debug!(
            addresses = addresses.len(),
            absorbed_places = absorbed,
            displaced,
            standalone = standalone.len(),
            "Address linking finished"
        );

        LinkedEntities {
            standalone,
            addresses,
        }
    }
}

/// Trim or drop standalone entities overlapping a grouped address
///
/// A recipient block is cut back to the lines before the first address it
/// reaches into; any other overlapping entity is dropped. Returns the kept
/// entities and the number dropped.
fn clear_address_spans(
    entities: Vec<Entity>,
    addresses: &[GroupedAddress],
    text: &str,
) -> (Vec<Entity>, usize) {
    let mut kept = Vec::with_capacity(entities.len());
    let mut dropped = 0usize;

    for mut entity in entities {
        let Some(address) = addresses
            .iter()
            .find(|a| a.start < entity.end() && entity.start() < a.end)
        else {
            kept.push(entity);
            continue;
        };

        let head = (entity.entity_type == EntityType::RecipientBlock)
            .then(|| text.get(entity.start()..address.start))
            .flatten()
            .map(str::trim_end)
            .filter(|head| !head.is_empty());
        match head {
            Some(head) => {
                let (start, end) = (entity.start(), entity.start() + head.len());
                entity.set_span(start, end, head);
                kept.push(entity.with_metadata("address_id", address.id.as_str()));
            }
            None => {
                tracing::trace!(
                    entity_type = %entity.entity_type,
                    start = entity.start(),
                    "Entity overlaps a grouped address; dropped"
                );
                dropped += 1;
            }
        }
    }
    (kept, dropped)
}

/// Merge entities lying wholly inside a recipient block into the block
///
/// The block keeps its span; confidences combine as `1 - (1 - a)(1 - b)`
/// and the contained types are listed under the `contains` metadata key.
fn fold_into_blocks(entities: Vec<Entity>) -> Vec<Entity> {
    let blocks: Vec<(usize, usize)> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::RecipientBlock)
        .map(|e| (e.start(), e.end()))
        .collect();
    if blocks.is_empty() {
        return entities;
    }

    let (mut kept, inner): (Vec<Entity>, Vec<Entity>) =
        entities.into_iter().partition(|e| {
            e.entity_type == EntityType::RecipientBlock
                || !blocks
                    .iter()
                    .any(|&(start, end)| start <= e.start() && e.end() <= end)
        });

    for entity in inner {
        let Some(block) = kept.iter_mut().find(|b| {
            b.entity_type == EntityType::RecipientBlock
                && b.start() <= entity.start()
                && entity.end() <= b.end()
        }) else {
            continue;
        };
        let (a, b) = (block.confidence(), entity.confidence());
        block.set_confidence(1.0 - (1.0 - a) * (1.0 - b));
        let label = entity.entity_type.label();
        block
            .metadata
            .entry("contains".to_string())
            .and_modify(|types| {
                if !types.split(',').any(|t| t == label) {
                    types.push(',');
                    types.push_str(label);
                }
            })
            .or_insert_with(|| label.to_string());
    }
    kept
}

fn is_place(entity_type: EntityType) -> bool {
    matches!(
        entity_type,
        EntityType::Location | EntityType::Address | EntityType::City | EntityType::Country
    )
}

/// Whether `kinds` appears in `template` in the same order, without repeats
fn is_ordered_subset(kinds: &[ComponentKind], template: &[ComponentKind]) -> bool {
    let mut position = 0;
    for kind in kinds {
        match template[position..].iter().position(|t| t == kind) {
            Some(offset) => position += offset + 1,
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DetectionSource;

    fn component(text: &str, kind: ComponentKind, value: &str) -> AddressComponent {
        let start = text.find(value).unwrap();
        let entity = Entity::from_span(
            text,
            kind.entity_type(),
            start,
            start + value.len(),
            0.8,
            DetectionSource::Pattern,
        )
        .unwrap();
        AddressComponent { kind, entity }
    }

    fn linker() -> AddressLinker {
        AddressLinker::new(&AddressConfig::default())
    }

    fn scenario_a() -> (&'static str, Vec<AddressComponent>) {
        let text = "Rue de Lausanne 12, 1000 Lausanne";
        let components = vec![
            component(text, StreetName, "Rue de Lausanne"),
            component(text, StreetNumber, "12"),
            component(text, PostalCode, "1000"),
            AddressComponent {
                kind: City,
                entity: Entity::from_span(text, EntityType::City, 25, 33, 0.8, DetectionSource::Pattern)
                    .unwrap(),
            },
        ];
        (text, components)
    }

    #[test]
    fn test_primary_pattern() {
        let (text, components) = scenario_a();
        let groups = linker().group_by_proximity(components, text);
        assert_eq!(groups.len(), 1);
        assert_eq!(AddressLinker::detect_pattern(&groups[0]), AddressPattern::Primary);
    }

    #[test]
    fn test_alternate_pattern() {
        let text = "1000 Lausanne, Rue de Lausanne 12";
        let components = vec![
            component(text, PostalCode, "1000"),
            AddressComponent {
                kind: City,
                entity: Entity::from_span(text, EntityType::City, 5, 13, 0.8, DetectionSource::Pattern)
                    .unwrap(),
            },
            component(text, StreetName, "Rue de Lausanne"),
            component(text, StreetNumber, "12"),
        ];
        assert_eq!(AddressLinker::detect_pattern(&components), AddressPattern::Alternate);
    }

    #[test]
    fn test_international_and_partial_patterns() {
        let text = "Bahnhofstrasse 10, 8001 Zürich, Schweiz";
        let full = vec![
            component(text, StreetName, "Bahnhofstrasse"),
            component(text, StreetNumber, "10"),
            component(text, PostalCode, "8001"),
            component(text, City, "Zürich"),
            component(text, Country, "Schweiz"),
        ];
        assert_eq!(AddressLinker::detect_pattern(&full), AddressPattern::International);
        assert_eq!(AddressLinker::detect_pattern(&full[2..4]), AddressPattern::Partial);
        assert_eq!(AddressLinker::detect_pattern(&full[..1]), AddressPattern::None);

        let reversed = vec![full[3].clone(), full[2].clone()];
        assert_eq!(AddressLinker::detect_pattern(&reversed), AddressPattern::None);
    }

    #[test]
    fn test_gap_splits_groups() {
        let text = format!("8001 Zürich{}3000 Bern", " ".repeat(60));
        let components = vec![
            component(&text, PostalCode, "8001"),
            component(&text, City, "Zürich"),
            component(&text, PostalCode, "3000"),
            component(&text, City, "Bern"),
        ];
        let groups = linker().group_by_proximity(components, &text);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_line_break_widens_threshold() {
        let text = format!("Bahnhofstrasse 10{}\n8001 Zürich", " ".repeat(70));
        let components = vec![
            component(&text, StreetName, "Bahnhofstrasse"),
            component(&text, StreetNumber, "10"),
            component(&text, PostalCode, "8001"),
            component(&text, City, "Zürich"),
        ];
        let groups = linker().group_by_proximity(components, &text);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_stacked_blocks_split_on_repeated_kind() {
        let text = "8001 Zürich\n3000 Bern";
        let components = vec![
            component(text, PostalCode, "8001"),
            component(text, City, "Zürich"),
            component(text, PostalCode, "3000"),
            component(text, City, "Bern"),
        ];
        let groups = linker().group_by_proximity(components, text);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_link_absorbs_components() {
        let (text, components) = scenario_a();
        let mut entities: Vec<Entity> = components.into_iter().map(|c| c.entity).collect();
        entities.push(
            Entity::from_span(text, EntityType::Location, 7, 15, 0.55, DetectionSource::Model)
                .unwrap(),
        );
        entities.push(
            Entity::new(EntityType::Email, 40, 50, "a@b.ch", 0.9, DetectionSource::Pattern).unwrap(),
        );

        let linked = linker().link(entities, text);
        assert_eq!(linked.addresses.len(), 1);
        let address = &linked.addresses[0];
        assert_eq!((address.start, address.end), (0, text.len()));
        assert_eq!(address.text, text);
        assert!(address.components.iter().all(|c| c.entity.is_linked()));
        assert_eq!(linked.standalone.len(), 1);
        assert_eq!(linked.standalone[0].entity_type, EntityType::Email);
    }

    #[test]
    fn test_unmatched_group_stays_standalone() {
        let text = "Zürich";
        let entities =
            vec![Entity::from_span(text, EntityType::City, 0, 6, 0.8, DetectionSource::Pattern).unwrap()];
        let linked = linker().link(entities, text);
        assert!(linked.addresses.is_empty());
        assert_eq!(linked.standalone.len(), 1);
        assert!(!linked.standalone[0].is_linked());
    }

    #[test]
    fn test_recipient_block_stops_above_address() {
        let text = "Herrn\nHans Müller\nRue de Lausanne 12\n1000 Lausanne";
        let city = text.rfind("Lausanne").unwrap();
        let mut entities: Vec<Entity> = vec![
            component(text, StreetName, "Rue de Lausanne").entity,
            component(text, StreetNumber, "12").entity,
            component(text, PostalCode, "1000").entity,
            Entity::from_span(text, EntityType::City, city, text.len(), 0.8, DetectionSource::Pattern)
                .unwrap(),
        ];
        entities.push(
            Entity::from_span(text, EntityType::RecipientBlock, 0, text.len(), 0.75, DetectionSource::Pattern)
                .unwrap(),
        );
        let name = text.find("Hans").unwrap();
        entities.push(
            Entity::from_span(text, EntityType::Person, name, name + "Hans Müller".len(), 0.75, DetectionSource::Model)
                .unwrap(),
        );

        let linked = linker().link(entities, text);
        assert_eq!(linked.addresses.len(), 1);
        let address = &linked.addresses[0];
        assert_eq!(address.text, "Rue de Lausanne 12\n1000 Lausanne");

        assert_eq!(linked.standalone.len(), 1);
        let block = &linked.standalone[0];
        assert_eq!(block.entity_type, EntityType::RecipientBlock);
        assert_eq!(block.text, "Herrn\nHans Müller");
        assert!(block.end() <= address.start);
        assert_eq!(block.metadata["address_id"], address.id);
        assert_eq!(block.metadata["contains"], "PERSON");
        assert!((block.confidence() - (1.0 - 0.25 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_other_entities_inside_address_are_dropped() {
        let (text, components) = scenario_a();
        let mut entities: Vec<Entity> = components.into_iter().map(|c| c.entity).collect();
        entities.push(
            Entity::from_span(text, EntityType::Reference, 16, 18, 0.6, DetectionSource::Pattern)
                .unwrap(),
        );

        let linked = linker().link(entities, text);
        assert_eq!(linked.addresses.len(), 1);
        assert!(linked.standalone.is_empty());
    }
}
