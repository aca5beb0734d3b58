//! Axis labels per technique.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLabels {
    pub x: &'static str,
    pub y: &'static str,
}

const VOLTAMMETRY: AxisLabels = AxisLabels {
    x: "Voltage (V)",
    y: "Current (A)",
};
const IMPEDANCE: AxisLabels = AxisLabels {
    x: "Re(Z) (Ω)",
    y: "-Im(Z) (Ω)",
};
const POTENTIOMETRY: AxisLabels = AxisLabels {
    x: "Time (s)",
    y: "Voltage (V)",
};
const GENERIC: AxisLabels = AxisLabels { x: "X", y: "Y" };

/// Static lookup, case-insensitive. Also understands the producer's mock class names.
pub fn axis_labels(technique: &str) -> AxisLabels {
    let t = technique.trim().to_ascii_uppercase();
    let t = t
        .strip_prefix("MOCK")
        .and_then(|rest| rest.strip_suffix("TECHNIQUE"))
        .unwrap_or(&t);
    match t {
        "CV" | "LP" => VOLTAMMETRY,
        "PEIS" => IMPEDANCE,
        "OCV" | "CP" => POTENTIOMETRY,
        _ => GENERIC,
    }
}
