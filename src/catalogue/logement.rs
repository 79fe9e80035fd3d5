//! logement.rs
//! Housing energy: heating oil, town gas under the regulated contracts, and
//! the household energy budget.

use super::base::{price_adjusted_expense, reference_path, sum_of, yearly, PRIX_FIOUL, PRIX_KWH_ELECTRICITE, PRIX_UNITAIRE_GAZ, TARIF_FIXE_GAZ};
use crate::compute::{kernel, ComputationError, EntityView, Value};
use crate::parameters::ParametersAt;
use crate::periods::{Period, PeriodUnit};
use crate::store::{Category, Formula, PeriodPolicy, Scalar, ValueType, VariableDefinition};

/// Regulated town-gas contracts, by increasing yearly consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypesContratGaz {
    Aucun,
    Base,
    B0,
    B1,
    B2i,
}

impl TypesContratGaz {
    pub const CONTRATS: [TypesContratGaz; 4] = [TypesContratGaz::Base, TypesContratGaz::B0, TypesContratGaz::B1, TypesContratGaz::B2i];

    /// Leaf name of the unit price under `PRIX_UNITAIRE_GAZ`.
    fn prix_kwh(self) -> Option<&'static str> {
        match self {
            TypesContratGaz::Aucun => None,
            TypesContratGaz::Base => Some("prix_kwh_base_ttc"),
            TypesContratGaz::B0 => Some("prix_kwh_b0_ttc"),
            TypesContratGaz::B1 => Some("prix_kwh_b1_ttc"),
            TypesContratGaz::B2i => Some("prix_kwh_b2i_ttc"),
        }
    }

    /// Leaf name of the subscription under `TARIF_FIXE_GAZ`.
    fn tarif_fixe(self) -> Option<&'static str> {
        match self {
            TypesContratGaz::Aucun => None,
            TypesContratGaz::Base => Some("base_0_1000"),
            TypesContratGaz::B0 => Some("b0_1000_6000"),
            TypesContratGaz::B1 => Some("b1_6_30000"),
            TypesContratGaz::B2i => Some("b2i_30000"),
        }
    }

    pub fn prix_unitaire_path(self) -> Option<String> {
        self.prix_kwh().map(|leaf| format!("{}.{}", PRIX_UNITAIRE_GAZ, leaf))
    }

    pub fn tarif_fixe_path(self) -> Option<String> {
        self.tarif_fixe().map(|leaf| format!("{}.{}", TARIF_FIXE_GAZ, leaf))
    }
}

impl Category for TypesContratGaz {
    const VARIANTS: &'static [&'static str] = &["aucun", "base", "b0", "b1", "b2i"];

    fn code(self) -> u16 { self as u16 }

    fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(TypesContratGaz::Aucun),
            1 => Some(TypesContratGaz::Base),
            2 => Some(TypesContratGaz::B0),
            3 => Some(TypesContratGaz::B1),
            4 => Some(TypesContratGaz::B2i),
            _ => None,
        }
    }
}

/// Per-contract value of a parameter, zero without a contract.
fn par_contrat(
    view: &mut EntityView<'_>,
    period: Period,
    parameters: &ParametersAt<'_>,
    path: fn(TypesContratGaz) -> Option<String>,
) -> Result<Vec<f64>, ComputationError> {
    let mut by_contract = [0.0; 5];
    for contrat in TypesContratGaz::CONTRATS {
        if let Some(p) = path(contrat) {
            by_contract[contrat.code() as usize] = parameters.number(&p)?;
        }
    }
    let contrats = view.categories::<TypesContratGaz>("depenses_gaz_contrat", period)?;
    Ok(contrats.iter().map(|c| by_contract[c.code() as usize]).collect())
}

/// The contract maximising the consumption a household can buy with its gas expense.
fn depenses_gaz_contrat() -> Formula {
    Formula::new(|view, period, parameters| {
        let mut offres = Vec::with_capacity(4);
        for contrat in TypesContratGaz::CONTRATS {
            let (Some(prix), Some(fixe)) = (contrat.prix_unitaire_path(), contrat.tarif_fixe_path()) else { continue };
            offres.push((contrat, parameters.number(&prix)?, parameters.number(&fixe)?));
        }
        let poste = view.float("poste_gaz_ville", period)?;
        let contrats: Vec<TypesContratGaz> = poste.iter()
            .map(|&depense| {
                if depense == 0.0 {
                    return TypesContratGaz::Aucun;
                }
                // Ties go to the first contract, as does a negative optimum.
                let mut meilleur = (TypesContratGaz::Base, f64::NEG_INFINITY);
                for &(contrat, prix, fixe) in &offres {
                    let quantite = (depense - fixe) / prix;
                    if quantite > meilleur.1 {
                        meilleur = (contrat, quantite);
                    }
                }
                if meilleur.1 < 0.0 { TypesContratGaz::Base } else { meilleur.0 }
            })
            .collect();
        Ok(Value::from_categories(&contrats))
    })
}

/// Variable gas spending after the price response. Households without a
/// contract spend nothing; fixed subscriptions are added back unchanged.
fn depenses_gaz_ville() -> Formula {
    Formula::new(|view, period, parameters| {
        let variables = view.float("depenses_gaz_variables", period)?;
        let tarif_fixe = view.float("depenses_gaz_tarif_fixe", period)?;

        let mut deltas = [0.0; 5];
        for contrat in TypesContratGaz::CONTRATS {
            let Some(prix) = contrat.prix_unitaire_path() else { continue };
            match parameters.number_if_defined(&reference_path(&prix))? {
                Some(reference) => deltas[contrat.code() as usize] = parameters.number(&prix)? - reference,
                None => return Ok(Value::from(kernel::add(&variables, &tarif_fixe))),
            }
        }

        let contrats = view.categories::<TypesContratGaz>("depenses_gaz_contrat", period)?;
        let prix_unitaire = view.float("depenses_gaz_prix_unitaire", period)?;
        let elasticites = view.float("elas_price_2_2", period)?;
        let ajustees: Vec<f64> = (0..view.count())
            .map(|i| match contrats[i] {
                TypesContratGaz::Aucun => 0.0,
                c => variables[i] * (1.0 + (1.0 + elasticites[i]) * deltas[c.code() as usize] / prix_unitaire[i]),
            })
            .collect();
        Ok(Value::from(kernel::add(&ajustees, &tarif_fixe)))
    })
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("depenses_combustibles_liquides", "Dépenses en combustibles liquides après réponse à l'évolution des prix")
            .formula(Formula::new(|view, period, parameters| {
                price_adjusted_expense(view, period, parameters, "poste_combustibles_liquides", "elas_price_2_2", PRIX_FIOUL)
            })),
        yearly("quantites_combustibles_liquides", "Quantité de combustibles liquides consommée (litres)").formula(Formula::new(|view, period, parameters| {
            let prix = parameters.number(PRIX_FIOUL)?;
            Ok(Value::from(kernel::scale(&view.float("depenses_combustibles_liquides", period)?, 1.0 / prix)))
        })),
        VariableDefinition::new("depenses_gaz_contrat", TypesContratGaz::value_type(), PeriodUnit::Year)
            .label("Contrat de gaz")
            .policy(PeriodPolicy::Dispatch)
            .default_value(Scalar::Enum(TypesContratGaz::Base.code()))
            .formula(depenses_gaz_contrat()),
        VariableDefinition::new("depenses_gaz_prix_unitaire", ValueType::Float, PeriodUnit::Year)
            .label("Prix unitaire du gaz rencontré par le ménage")
            .policy(PeriodPolicy::Dispatch)
            .formula(Formula::new(|view, period, parameters| {
                Ok(Value::from(par_contrat(view, period, parameters, TypesContratGaz::prix_unitaire_path)?))
            })),
        yearly("depenses_gaz_tarif_fixe", "Dépenses en gaz au titre de l'abonnement").formula(Formula::new(|view, period, parameters| {
            Ok(Value::from(par_contrat(view, period, parameters, TypesContratGaz::tarif_fixe_path)?))
        })),
        yearly("depenses_gaz_variables", "Dépenses en gaz hors abonnement").formula(Formula::new(|view, period, _| {
            let poste = view.float("poste_gaz_ville", period)?;
            let fixe = view.float("depenses_gaz_tarif_fixe", period)?;
            let contrats = view.categories::<TypesContratGaz>("depenses_gaz_contrat", period)?;
            let variables: Vec<f64> = contrats.iter().zip(poste.iter().zip(fixe.iter()))
                .map(|(c, (&p, &f))| if *c == TypesContratGaz::Aucun { 0.0 } else { (p - f).max(0.0) })
                .collect();
            Ok(Value::from(variables))
        })),
        yearly("depenses_gaz_ville", "Dépenses en gaz après réponse à l'évolution des prix").formula(depenses_gaz_ville()),
        yearly("quantites_gaz_contrat", "Quantité de gaz (kWh) achetée au titre du contrat").formula(Formula::new(|view, period, _| {
            let variables = view.float("depenses_gaz_variables", period)?;
            let prix = view.float("depenses_gaz_prix_unitaire", period)?;
            Ok(Value::from(kernel::safe_div(&variables, &prix)))
        })),
        // Social tariffs lower the bill, not the consumption.
        yearly("quantites_gaz", "Quantité de gaz (kWh) consommée, tarifs sociaux inclus").formula(Formula::new(|view, period, _| {
            let contrat = view.float("quantites_gaz_contrat", period)?;
            let tarifs_sociaux = view.float("tarifs_sociaux_gaz", period)?;
            let prix = view.float("depenses_gaz_prix_unitaire", period)?;
            Ok(Value::from(kernel::add(&contrat, &kernel::safe_div(&tarifs_sociaux, &prix))))
        })),
        yearly("quantites_electricite", "Quantité d'électricité (kWh) consommée, au tarif de base").formula(Formula::new(|view, period, parameters| {
            let prix = parameters.number(PRIX_KWH_ELECTRICITE)?;
            Ok(Value::from(kernel::scale(&view.float("depenses_electricite", period)?, 1.0 / prix)))
        })),
        yearly("depenses_energies_logement", "Dépenses en énergies dans le logement").formula(sum_of(&[
            "depenses_combustibles_liquides",
            "depenses_combustibles_solides",
            "depenses_electricite",
            "depenses_energie_thermique",
            "depenses_gaz_liquefie",
            "depenses_gaz_ville",
        ])),
        yearly("depenses_energies_totales", "Dépenses en énergies du logement et carburants")
            .formula(sum_of(&["depenses_carburants", "depenses_energies_logement"])),
        consomme("combustibles_liquides", "depenses_combustibles_liquides", "Le ménage consomme des combustibles liquides"),
        consomme("electricite", "depenses_electricite", "Le ménage consomme de l'électricité"),
        consomme("gaz_ville", "depenses_gaz_ville", "Le ménage consomme du gaz de ville"),
    ]
}

fn consomme(name: &str, depense: &'static str, label: &str) -> VariableDefinition {
    VariableDefinition::new(name, ValueType::Bool, PeriodUnit::Year)
        .label(label)
        .formula(Formula::new(move |view, period, _| {
            Ok(Value::from(view.float(depense, period)?.iter().map(|&d| d > 0.0).collect::<Vec<_>>()))
        }))
}
