#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignStage {
    ValidatingConfig,
    Cleaning,
    ServiceLines,
    Synthesizing,
    Grouping,
    Simplifying,
    DerivingNodes,
    AggregatingDemand,
    Sizing,
    ThermalLosses,
    Completed,
}

impl DesignStage {
    pub fn label(self) -> &'static str {
        match self {
            DesignStage::ValidatingConfig => "validate",
            DesignStage::Cleaning => "clean",
            DesignStage::ServiceLines => "service-lines",
            DesignStage::Synthesizing => "steiner",
            DesignStage::Grouping => "group",
            DesignStage::Simplifying => "simplify",
            DesignStage::DerivingNodes => "nodes",
            DesignStage::AggregatingDemand => "demand",
            DesignStage::Sizing => "sizing",
            DesignStage::ThermalLosses => "thermal",
            DesignStage::Completed => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesignProgressEvent {
    pub stage: DesignStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}
