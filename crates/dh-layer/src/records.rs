//! Typed records for each layer role.

use core::fmt;
use core::str::FromStr;

use dh_core::FeatureId;

use crate::attrs::{AttrValue, Attributes, Record};
use crate::error::{LayerError, LayerResult};

fn id_attr(attrs: &Attributes, name: &str) -> LayerResult<Option<FeatureId>> {
    match attrs.int(name)? {
        None => Ok(None),
        Some(v) => u32::try_from(v)
            .map(|i| Some(FeatureId::from_index(i)))
            .map_err(|_| LayerError::Attribute {
                name: name.to_string(),
                reason: format!("{v} is not a valid feature id"),
            }),
    }
}

fn set_opt_real(attrs: &mut Attributes, name: &str, value: Option<f64>) {
    if let Some(v) = value {
        attrs.set(name, AttrValue::Real(v));
    }
}

fn set_opt_id(attrs: &mut Attributes, name: &str, value: Option<FeatureId>) {
    if let Some(id) = value {
        attrs.set(name, AttrValue::Int(i64::from(id.index())));
    }
}

/// Road centre line. Roads carry no attributes the engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadRecord {
    pub name: Option<String>,
}

impl Record for RoadRecord {
    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        if let Some(name) = &self.name {
            attrs.set("name", AttrValue::Text(name.clone()));
        }
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> LayerResult<Self> {
        Ok(Self {
            name: attrs.text("name")?.map(str::to_string),
        })
    }
}

/// A building (demand point).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingRecord {
    /// Own peak heat demand in kW; absent means 0.
    pub heat_kw: Option<f64>,
}

impl BuildingRecord {
    pub fn demand_kw(&self) -> f64 {
        self.heat_kw.unwrap_or(0.0)
    }
}

impl Record for BuildingRecord {
    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        set_opt_real(&mut attrs, "heat_kw", self.heat_kw);
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> LayerResult<Self> {
        Ok(Self {
            heat_kw: attrs.real("heat_kw")?,
        })
    }
}

/// Line from a building to its nearest road.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLineRecord {
    pub building_id: FeatureId,
    pub road_id: FeatureId,
}

impl Record for ServiceLineRecord {
    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with(
                "building_id",
                AttrValue::Int(i64::from(self.building_id.index())),
            )
            .with("road_id", AttrValue::Int(i64::from(self.road_id.index())))
    }

    fn from_attributes(attrs: &Attributes) -> LayerResult<Self> {
        let missing = |name: &str| LayerError::Attribute {
            name: name.to_string(),
            reason: "required".to_string(),
        };
        Ok(Self {
            building_id: id_attr(attrs, "building_id")?.ok_or_else(|| missing("building_id"))?,
            road_id: id_attr(attrs, "road_id")?.ok_or_else(|| missing("road_id"))?,
        })
    }
}

/// Origin label of an edge produced by a simplification operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyTag {
    /// Collapsed to a straight chord.
    Simplified,
    /// Corner-smoothed.
    Bended,
    /// Merged as-is, pending human review.
    Manual,
}

impl TopologyTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TopologyTag::Simplified => "simplified",
            TopologyTag::Bended => "bended",
            TopologyTag::Manual => "manual",
        }
    }
}

impl fmt::Display for TopologyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyTag {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simplified" => Ok(TopologyTag::Simplified),
            "bended" => Ok(TopologyTag::Bended),
            "manual" => Ok(TopologyTag::Manual),
            other => Err(LayerError::Attribute {
                name: "topology".to_string(),
                reason: format!("unknown topology tag '{other}'"),
            }),
        }
    }
}

/// Diagnostic flags written on network edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeFlag {
    /// Downstream demand exceeds the largest catalog pipe.
    CapacityExceeded,
    /// Edge is not reachable from the source node.
    Unreached,
}

impl EdgeFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeFlag::CapacityExceeded => "capacity_exceeded",
            EdgeFlag::Unreached => "unreached",
        }
    }
}

impl FromStr for EdgeFlag {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capacity_exceeded" => Ok(EdgeFlag::CapacityExceeded),
            "unreached" => Ok(EdgeFlag::Unreached),
            other => Err(LayerError::Attribute {
                name: "flags".to_string(),
                reason: format!("unknown edge flag '{other}'"),
            }),
        }
    }
}

/// A pipe segment of the synthesized network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeRecord {
    /// Road feature this segment was routed along (absent for snap connectors).
    pub road_id: Option<FeatureId>,
    /// Set when the edge replaced a group during simplification.
    pub topology: Option<TopologyTag>,
    /// Assigned nominal pipe size.
    pub dn: Option<u32>,
    /// Simultaneous downstream load in kW.
    pub qs_kw: Option<f64>,
    /// Maximum heat flow of the assigned pipe in kW.
    pub capacity_kw: Option<f64>,
    /// Specific heat loss of the supply pipe, W/m.
    pub loss_supply_w_m: Option<f64>,
    /// Specific heat loss of the return pipe, W/m.
    pub loss_return_w_m: Option<f64>,
    /// Total heat loss of the segment (supply + return), W.
    pub loss_w: Option<f64>,
    pub flags: Vec<EdgeFlag>,
}

impl EdgeRecord {
    pub fn along_road(road_id: Option<FeatureId>) -> Self {
        Self {
            road_id,
            ..Self::default()
        }
    }

    pub fn tagged(tag: TopologyTag) -> Self {
        Self {
            topology: Some(tag),
            ..Self::default()
        }
    }

    pub fn set_flag(&mut self, flag: EdgeFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
            self.flags.sort();
        }
    }

    pub fn has_flag(&self, flag: EdgeFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Drop everything the sizing and thermal stages write.
    pub fn clear_sizing(&mut self) {
        self.dn = None;
        self.qs_kw = None;
        self.capacity_kw = None;
        self.loss_supply_w_m = None;
        self.loss_return_w_m = None;
        self.loss_w = None;
        self.flags.clear();
    }
}

impl Record for EdgeRecord {
    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        set_opt_id(&mut attrs, "road_id", self.road_id);
        if let Some(tag) = self.topology {
            attrs.set("topology", AttrValue::Text(tag.as_str().to_string()));
        }
        if let Some(dn) = self.dn {
            attrs.set("dn", AttrValue::Int(i64::from(dn)));
        }
        set_opt_real(&mut attrs, "qs_kw", self.qs_kw);
        set_opt_real(&mut attrs, "capacity_kw", self.capacity_kw);
        set_opt_real(&mut attrs, "loss_supply_w_m", self.loss_supply_w_m);
        set_opt_real(&mut attrs, "loss_return_w_m", self.loss_return_w_m);
        set_opt_real(&mut attrs, "loss_w", self.loss_w);
        if !self.flags.is_empty() {
            let joined: Vec<&str> = self.flags.iter().map(|f| f.as_str()).collect();
            attrs.set("flags", AttrValue::Text(joined.join(",")));
        }
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> LayerResult<Self> {
        let dn = match attrs.int("dn")? {
            None => None,
            Some(v) => Some(u32::try_from(v).map_err(|_| LayerError::Attribute {
                name: "dn".to_string(),
                reason: format!("{v} is not a valid nominal size"),
            })?),
        };
        let mut flags: Vec<EdgeFlag> = Vec::new();
        if let Some(text) = attrs.text("flags")? {
            for part in text.split(',').filter(|p| !p.is_empty()) {
                flags.push(part.parse::<EdgeFlag>()?);
            }
        }
        flags.sort();
        Ok(Self {
            road_id: id_attr(attrs, "road_id")?,
            topology: attrs.text("topology")?.map(str::parse::<TopologyTag>).transpose()?,
            dn,
            qs_kw: attrs.real("qs_kw")?,
            capacity_kw: attrs.real("capacity_kw")?,
            loss_supply_w_m: attrs.real("loss_supply_w_m")?,
            loss_return_w_m: attrs.real("loss_return_w_m")?,
            loss_w: attrs.real("loss_w")?,
            flags,
        })
    }
}

/// A junction or dead end of the network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRecord {
    /// Own demand, or the sum of downstream demand at branch points (kW).
    pub heat_kw: f64,
    /// Number of downstream demand points.
    pub nr_con: u32,
    /// Simultaneous load in kW.
    pub qs_kw: f64,
    /// Building whose demand this node inherited.
    pub building_id: Option<FeatureId>,
}

impl Record for NodeRecord {
    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new()
            .with("heat_kw", AttrValue::Real(self.heat_kw))
            .with("nr_con", AttrValue::Int(i64::from(self.nr_con)))
            .with("qs_kw", AttrValue::Real(self.qs_kw));
        set_opt_id(&mut attrs, "building_id", self.building_id);
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> LayerResult<Self> {
        let nr_con = match attrs.int("nr_con")? {
            None => 0,
            Some(v) => u32::try_from(v).map_err(|_| LayerError::Attribute {
                name: "nr_con".to_string(),
                reason: format!("{v} is negative"),
            })?,
        };
        Ok(Self {
            heat_kw: attrs.real("heat_kw")?.unwrap_or(0.0),
            nr_con,
            qs_kw: attrs.real("qs_kw")?.unwrap_or(0.0),
            building_id: id_attr(attrs, "building_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_demand_defaults_to_zero() {
        let rec = BuildingRecord::from_attributes(&Attributes::new()).unwrap();
        assert_eq!(rec.demand_kw(), 0.0);

        let rec = BuildingRecord::from_attributes(
            &Attributes::new().with("heat_kw", AttrValue::Int(12)),
        )
        .unwrap();
        assert_eq!(rec.demand_kw(), 12.0);
    }

    #[test]
    fn edge_record_attributes_round_trip() {
        let mut rec = EdgeRecord::tagged(TopologyTag::Bended);
        rec.road_id = Some(FeatureId::from_index(4));
        rec.dn = Some(80);
        rec.set_flag(EdgeFlag::CapacityExceeded);
        rec.set_flag(EdgeFlag::CapacityExceeded);

        let attrs = rec.to_attributes();
        assert_eq!(attrs.text("topology").unwrap(), Some("bended"));
        assert_eq!(attrs.text("flags").unwrap(), Some("capacity_exceeded"));
        assert_eq!(EdgeRecord::from_attributes(&attrs).unwrap(), rec);
    }

    #[test]
    fn unknown_topology_tag_is_rejected() {
        let attrs = Attributes::new().with("topology", AttrValue::Text("wavy".into()));
        assert!(EdgeRecord::from_attributes(&attrs).is_err());
    }

    #[test]
    fn negative_node_count_is_rejected() {
        let attrs = Attributes::new().with("nr_con", AttrValue::Int(-1));
        assert!(NodeRecord::from_attributes(&attrs).is_err());
    }

    #[test]
    fn service_line_requires_ids() {
        assert!(ServiceLineRecord::from_attributes(&Attributes::new()).is_err());
    }
}
