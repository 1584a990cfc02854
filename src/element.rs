//! Axial elements: cross sections, bilinear materials and buckling laws.

use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::errors::ElementPropertyError;
use crate::geometry::{Line, Point};

/// Geometric properties of an element cross section.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Area in square metres.
    pub area: f64,
    /// Smallest second moment of area in metres to the fourth.
    pub inertia: f64,
}

impl CrossSection {
    /// Create a section from its area and inertia.
    #[must_use]
    pub const fn new(area: f64, inertia: f64) -> Self {
        Self { area, inertia }
    }

    /// Solid circular section of the given diameter.
    #[must_use]
    pub fn circular(diameter: f64) -> Self {
        let radius = diameter / 2.0;
        Self::new(PI * radius.powi(2), PI * radius.powi(4) / 4.0)
    }

    /// Hollow circular section of the given outer diameter and wall thickness.
    #[must_use]
    pub fn tube(diameter: f64, thickness: f64) -> Self {
        let outer = diameter / 2.0;
        let inner = (outer - thickness).max(0.0);
        Self::new(
            PI * (outer.powi(2) - inner.powi(2)),
            PI * (outer.powi(4) - inner.powi(4)) / 4.0,
        )
    }
}

/// Linear elastic material with distinct tension and compression branches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BilinearMaterial {
    /// Young modulus used while the element is elongated, in pascals.
    pub young_tension: f64,
    /// Young modulus used while the element is shortened, in pascals.
    pub young_compression: f64,
    /// Yield strength in tension, in pascals.
    pub yield_tension: f64,
    /// Yield strength in compression (positive value), in pascals.
    pub yield_compression: f64,
    /// Mass density in kilograms per cubic metre.
    #[serde(default)]
    pub density: f64,
}

impl BilinearMaterial {
    /// Create a material with explicit tension and compression branches.
    #[must_use]
    pub const fn new(
        young_tension: f64,
        young_compression: f64,
        yield_tension: f64,
        yield_compression: f64,
    ) -> Self {
        Self {
            young_tension,
            young_compression,
            yield_tension,
            yield_compression,
            density: 0.0,
        }
    }

    /// Material behaving identically in tension and compression.
    #[must_use]
    pub const fn symmetric(young: f64, yield_strength: f64) -> Self {
        Self::new(young, young, yield_strength, yield_strength)
    }

    /// Return the material with the given mass density.
    #[must_use]
    pub const fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }
}

/// Reduction of the compression resistance of an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucklingLaw {
    /// Plastic resistance only.
    Yielding,
    /// Smallest of the plastic resistance and the Euler critical load.
    #[default]
    Euler,
    /// Rankine interaction of plastic resistance and Euler critical load.
    Rankine,
    /// EN 1993-1-1 buckling curve a.
    EurocodeA,
    /// EN 1993-1-1 buckling curve b.
    EurocodeB,
    /// EN 1993-1-1 buckling curve c.
    EurocodeC,
    /// EN 1993-1-1 buckling curve d.
    EurocodeD,
    /// No compression resistance at all.
    Slack,
}

impl BucklingLaw {
    /// Imperfection factor of the Eurocode curves.
    fn imperfection_factor(self) -> Option<f64> {
        match self {
            Self::EurocodeA => Some(0.21),
            Self::EurocodeB => Some(0.34),
            Self::EurocodeC => Some(0.49),
            Self::EurocodeD => Some(0.76),
            _ => None,
        }
    }

    /// Compression capacity (positive) from the plastic resistance `n_pl` and the
    /// elastic critical load `n_cr`.
    #[must_use]
    pub fn capacity(self, n_pl: f64, n_cr: f64) -> f64 {
        match self {
            Self::Slack => 0.0,
            Self::Yielding => n_pl,
            _ if n_pl <= 0.0 || n_cr <= 0.0 => 0.0,
            Self::Euler => n_pl.min(n_cr),
            Self::Rankine => n_pl * n_cr / (n_pl + n_cr),
            curve => {
                let alpha = curve.imperfection_factor().unwrap_or(0.0);
                let slenderness = (n_pl / n_cr).sqrt();
                let phi = 0.5 * (1.0 + alpha * (slenderness - 0.2) + slenderness.powi(2));
                let chi = 1.0 / (phi + (phi.powi(2) - slenderness.powi(2)).max(0.0).sqrt());
                chi.min(1.0) * n_pl
            }
        }
    }
}

/// Role of an element, which fixes the sign of the forces it can carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Carries tension and compression.
    #[default]
    Bar,
    /// Tension only; slack when shortened.
    Cable,
    /// Compression only.
    Strut,
}

/// An axial element between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Position of the element in the element list.
    pub idx: usize,
    /// Indices of the start and end nodes.
    pub end_nodes: [usize; 2],
    /// Current geometry.
    pub line: Line,
    /// Unstrained length in metres.
    pub free_length: f64,
    /// Cross section.
    pub cross_section: CrossSection,
    /// Material.
    pub material: BilinearMaterial,
    /// Compression resistance law.
    pub buckling: BucklingLaw,
    /// Buckling length factor.
    pub kb: f64,
    /// Axial force in newtons, tension positive.
    pub tension: f64,
    /// Role of the element.
    pub kind: ElementKind,
    /// Whether `free_length` was set explicitly instead of taken from the input line.
    #[serde(default)]
    pub(crate) free_length_is_given: bool,
}

impl Element {
    /// Element of `kind` whose free length is the input line length.
    fn with_kind(
        kind: ElementKind,
        line: Line,
        cross_section: CrossSection,
        material: BilinearMaterial,
        buckling: BucklingLaw,
    ) -> Self {
        Self {
            idx: 0,
            end_nodes: [0, 0],
            free_length: line.length(),
            line,
            cross_section,
            material,
            buckling,
            kb: 1.0,
            tension: 0.0,
            kind,
            free_length_is_given: false,
        }
    }

    /// Element resisting both tension and compression.
    #[must_use]
    pub fn bar(line: Line, cross_section: CrossSection, material: BilinearMaterial) -> Self {
        Self::with_kind(ElementKind::Bar, line, cross_section, material, BucklingLaw::Euler)
    }

    /// Tension only element. The compression branch of `material` is discarded.
    #[must_use]
    pub fn cable(line: Line, cross_section: CrossSection, material: BilinearMaterial) -> Self {
        let material = BilinearMaterial {
            young_compression: 0.0,
            yield_compression: 0.0,
            ..material
        };
        Self::with_kind(ElementKind::Cable, line, cross_section, material, BucklingLaw::Slack)
    }

    /// Compression only element. The tension branch of `material` is discarded.
    #[must_use]
    pub fn strut(line: Line, cross_section: CrossSection, material: BilinearMaterial) -> Self {
        let material = BilinearMaterial {
            young_tension: 0.0,
            yield_tension: 0.0,
            ..material
        };
        Self::with_kind(ElementKind::Strut, line, cross_section, material, BucklingLaw::Euler)
    }

    /// Return the element with another buckling law and length factor.
    #[must_use]
    pub fn with_buckling(mut self, buckling: BucklingLaw, kb: f64) -> Self {
        self.buckling = if self.kind == ElementKind::Cable {
            BucklingLaw::Slack
        } else {
            buckling
        };
        self.kb = kb;
        self
    }

    /// Return the element with an explicit free length.
    #[must_use]
    pub fn with_free_length(mut self, free_length: f64) -> Self {
        self.free_length = free_length;
        self.free_length_is_given = true;
        self
    }

    /// Check that the properties describe a physical element.
    ///
    /// # Errors
    ///
    /// Returns the first [`ElementPropertyError`] found.
    pub fn validate(&self) -> Result<(), ElementPropertyError> {
        let section = self.cross_section;
        let material = self.material;
        if section.area <= 0.0 || !section.area.is_finite() {
            return Err(ElementPropertyError::NonPositiveArea(section.area));
        }
        if section.inertia < 0.0 {
            return Err(ElementPropertyError::NegativeInertia(section.inertia));
        }
        for young in [material.young_tension, material.young_compression] {
            if young < 0.0 {
                return Err(ElementPropertyError::NegativeYoungModulus(young));
            }
        }
        if material.young_tension == 0.0 && material.young_compression == 0.0 {
            return Err(ElementPropertyError::NoStiffness);
        }
        for strength in [material.yield_tension, material.yield_compression] {
            if strength < 0.0 {
                return Err(ElementPropertyError::NegativeYieldStrength(strength));
            }
        }
        if material.density < 0.0 {
            return Err(ElementPropertyError::NegativeDensity(material.density));
        }
        if self.free_length <= 0.0 {
            return Err(ElementPropertyError::NonPositiveFreeLength(self.free_length));
        }
        if self.kb <= 0.0 {
            return Err(ElementPropertyError::NonPositiveBucklingFactor(self.kb));
        }
        Ok(())
    }

    /// Current length of the element.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.line.length()
    }

    /// Unit vector from the start node to the end node.
    #[must_use]
    pub fn direction(&self) -> Option<Vector3<f64>> {
        self.line.direction()
    }

    /// Young modulus of the branch selected by `elongation = length - free_length`.
    #[must_use]
    pub fn young_modulus_for(&self, elongation: f64) -> f64 {
        if elongation >= 0.0 {
            self.material.young_tension
        } else {
            self.material.young_compression
        }
    }

    /// Axial force corresponding to a current `length`.
    #[must_use]
    pub fn tension_at(&self, length: f64) -> f64 {
        let elongation = length - self.free_length;
        self.young_modulus_for(elongation) * self.cross_section.area * elongation / self.free_length
    }

    /// Young modulus governing small displacements around the current state.
    ///
    /// An unstressed element uses the branch it is designed for.
    #[must_use]
    pub fn working_young_modulus(&self) -> f64 {
        if self.tension > 0.0 {
            self.material.young_tension
        } else if self.tension < 0.0 {
            self.material.young_compression
        } else {
            match self.kind {
                ElementKind::Strut => self.material.young_compression,
                ElementKind::Bar | ElementKind::Cable => self.material.young_tension,
            }
        }
    }

    /// Axial stiffness `E A / L0` of the working branch.
    #[must_use]
    pub fn working_axial_stiffness(&self) -> f64 {
        self.working_young_modulus() * self.cross_section.area / self.free_length
    }

    /// Axial stiffness `E A / L0` of the stiffer branch.
    #[must_use]
    pub fn max_axial_stiffness(&self) -> f64 {
        self.material
            .young_tension
            .max(self.material.young_compression)
            * self.cross_section.area
            / self.free_length
    }

    /// Move the element onto new end points and update its tension.
    pub fn update_geometry(&mut self, start: Point, end: Point) {
        self.line = Line::new(start, end);
        self.tension = self.tension_at(self.line.length());
    }

    /// Elastic critical load over the buckling length `kb * free_length`.
    #[must_use]
    pub fn critical_load(&self) -> f64 {
        let buckling_length = self.kb * self.free_length;
        PI.powi(2) * self.material.young_compression * self.cross_section.inertia
            / buckling_length.powi(2)
    }

    /// Tensile resistance (non-negative).
    #[must_use]
    pub fn tensile_resistance(&self) -> f64 {
        self.material.yield_tension * self.cross_section.area
    }

    /// Compression resistance after buckling reduction (non-positive).
    #[must_use]
    pub fn compression_resistance(&self) -> f64 {
        let n_pl = self.material.yield_compression * self.cross_section.area;
        -self.buckling.capacity(n_pl, self.critical_load())
    }

    /// Interval of admissible axial forces `[compression, tension]`.
    #[must_use]
    pub fn resistance(&self) -> (f64, f64) {
        (self.compression_resistance(), self.tensile_resistance())
    }

    /// Ratio of the current tension to the resistance on the same side.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        let resistance = if self.tension >= 0.0 {
            self.tensile_resistance()
        } else {
            self.compression_resistance()
        };
        if self.tension == 0.0 {
            0.0
        } else if resistance == 0.0 {
            f64::INFINITY
        } else {
            self.tension / resistance
        }
    }

    /// Self weight mass `rho A L0` in kilograms.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.material.density * self.cross_section.area * self.free_length
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{line, point};

    fn unit_line() -> Line {
        line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0))
    }

    #[test]
    fn circular_sections_match_closed_forms() {
        let solid = CrossSection::circular(0.008);
        assert_relative_eq!(solid.area, 50.265e-6, max_relative = 1.0e-4);
        let tube = CrossSection::tube(0.1, 0.05);
        assert_relative_eq!(tube.area, CrossSection::circular(0.1).area);
        assert_relative_eq!(tube.inertia, CrossSection::circular(0.1).inertia);
    }

    #[test]
    fn buckling_laws_reduce_compression_capacity() {
        assert_eq!(BucklingLaw::Yielding.capacity(100.0, 50.0), 100.0);
        assert_eq!(BucklingLaw::Euler.capacity(100.0, 50.0), 50.0);
        assert_relative_eq!(
            BucklingLaw::Rankine.capacity(100.0, 50.0),
            100.0 / 3.0,
            max_relative = 1.0e-12
        );
        assert_eq!(BucklingLaw::Slack.capacity(100.0, 50.0), 0.0);
        assert_relative_eq!(
            BucklingLaw::EurocodeA.capacity(100.0, 100.0),
            66.56,
            max_relative = 1.0e-3
        );
        assert_relative_eq!(
            BucklingLaw::EurocodeC.capacity(100.0, 100.0),
            53.99,
            max_relative = 1.0e-3
        );
        assert_eq!(BucklingLaw::EurocodeB.capacity(100.0, 1.0e12), 100.0);
        assert_eq!(BucklingLaw::Euler.capacity(100.0, 0.0), 0.0);
    }

    #[test]
    fn cables_are_tension_only() {
        let cable = Element::cable(
            unit_line(),
            CrossSection::new(1.0e-4, 0.0),
            BilinearMaterial::symmetric(100.0e9, 500.0e6),
        );
        assert_eq!(cable.tension_at(0.9), 0.0);
        assert_relative_eq!(
            cable.tension_at(1.01),
            100.0e9 * 1.0e-4 * 0.01,
            max_relative = 1.0e-9
        );
        let (compression, tension) = cable.resistance();
        assert_eq!(compression, 0.0);
        assert_relative_eq!(tension, 50_000.0, max_relative = 1.0e-12);
        assert_eq!(cable.with_buckling(BucklingLaw::Euler, 1.0).buckling, BucklingLaw::Slack);
    }

    #[test]
    fn struts_are_compression_only() {
        let strut = Element::strut(
            unit_line(),
            CrossSection::circular(0.02),
            BilinearMaterial::symmetric(200.0e9, 355.0e6),
        );
        assert_eq!(strut.tension_at(1.1), 0.0);
        assert!(strut.tension_at(0.99) < 0.0);
        let (compression, tension) = strut.resistance();
        assert!(compression < 0.0);
        assert_eq!(tension, 0.0);
        assert_eq!(strut.working_young_modulus(), 200.0e9);
    }

    #[test]
    fn bilinear_branches_follow_the_elongation_sign() {
        let mut bar = Element::bar(
            unit_line(),
            CrossSection::new(1.0e-3, 1.0e-8),
            BilinearMaterial::new(200.0e9, 100.0e9, 300.0e6, 300.0e6),
        );
        assert_relative_eq!(
            bar.tension_at(1.001),
            200.0e9 * 1.0e-3 * 1.0e-3,
            max_relative = 1.0e-9
        );
        assert_relative_eq!(
            bar.tension_at(0.999),
            -100.0e9 * 1.0e-3 * 1.0e-3,
            max_relative = 1.0e-9
        );
        bar.update_geometry(point(0.0, 0.0, 0.0), point(0.999, 0.0, 0.0));
        assert!(bar.tension < 0.0);
        assert_eq!(bar.working_young_modulus(), 100.0e9);
    }

    #[test]
    fn utilization_uses_the_matching_resistance() {
        let mut bar = Element::bar(
            unit_line(),
            CrossSection::new(1.0e-3, 1.0e-6),
            BilinearMaterial::symmetric(200.0e9, 250.0e6),
        )
        .with_buckling(BucklingLaw::Yielding, 1.0);
        bar.tension = 125_000.0;
        assert_relative_eq!(bar.utilization(), 0.5, max_relative = 1.0e-12);
        bar.tension = -250_000.0;
        assert_relative_eq!(bar.utilization(), 1.0, max_relative = 1.0e-12);
    }

    #[test]
    fn invalid_properties_are_rejected() {
        let section = CrossSection::new(0.0, 0.0);
        let bar = Element::bar(unit_line(), section, BilinearMaterial::symmetric(1.0, 1.0));
        assert_eq!(bar.validate(), Err(ElementPropertyError::NonPositiveArea(0.0)));

        let stiffless = Element::bar(
            unit_line(),
            CrossSection::new(1.0, 0.0),
            BilinearMaterial::symmetric(0.0, 1.0),
        );
        assert_eq!(stiffless.validate(), Err(ElementPropertyError::NoStiffness));

        let collapsed = Element::bar(
            unit_line(),
            CrossSection::new(1.0, 0.0),
            BilinearMaterial::symmetric(1.0, 1.0),
        )
        .with_free_length(0.0);
        assert_eq!(
            collapsed.validate(),
            Err(ElementPropertyError::NonPositiveFreeLength(0.0))
        );
    }
}
