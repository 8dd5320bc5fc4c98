//! Reference name enrichment of logbook payloads
//!
//! Every distinct species, gear and port code of a timeline is looked up
//! once, concurrently. A code with no reference entry, or whose lookup
//! fails, keeps its code and gets no name.

use super::model::{Catch, Gear, Haul, LogbookMessage, LogbookMessageValue};
use crate::repositories::ReferenceDataRepository;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Labels of the target species groups declared on effort zone entry/exit
const TARGET_SPECIES_GROUPS: &[(&str, &str)] = &[("DEM", "Démersal"), ("PEL", "Pélagique")];

pub fn target_species_name(code: &str) -> Option<&'static str> {
    TARGET_SPECIES_GROUPS
        .iter()
        .find(|(group, _)| *group == code)
        .map(|(_, name)| *name)
}

#[derive(Default)]
struct Codes {
    species: BTreeSet<String>,
    gears: BTreeSet<String>,
    ports: BTreeSet<String>,
}

impl Codes {
    fn catches(&mut self, catches: &[Catch]) {
        self.species.extend(catches.iter().filter_map(|c| c.species.clone()));
    }

    fn gears(&mut self, gears: &[Gear]) {
        self.gears.extend(gears.iter().filter_map(|g| g.gear.clone()));
    }

    fn hauls(&mut self, hauls: &[Haul]) {
        for haul in hauls {
            self.gears.extend(haul.gear.clone());
            self.catches(&haul.catches);
        }
    }

    fn port(&mut self, port: &Option<String>) {
        self.ports.extend(port.clone());
    }
}

#[derive(Default)]
struct Names {
    species: HashMap<String, String>,
    gears: HashMap<String, String>,
    ports: HashMap<String, String>,
}

impl Names {
    fn catches(&self, catches: &mut [Catch]) {
        for catch in catches {
            catch.species_name = catch.species.as_ref().and_then(|c| self.species.get(c)).cloned();
        }
    }

    fn gears(&self, gears: &mut [Gear]) {
        for gear in gears {
            gear.gear_name = gear.gear.as_ref().and_then(|c| self.gears.get(c)).cloned();
        }
    }

    fn port(&self, port: &Option<String>) -> Option<String> {
        port.as_ref().and_then(|c| self.ports.get(c)).cloned()
    }
}

fn collect_codes(messages: &[LogbookMessage]) -> Codes {
    let mut codes = Codes::default();
    for message in messages {
        match &message.message {
            Some(LogbookMessageValue::Dep(dep)) => {
                codes.port(&dep.departure_port);
                codes.gears(&dep.gear_onboard);
                codes.catches(&dep.species_onboard);
            }
            Some(LogbookMessageValue::Far(far)) => codes.hauls(&far.hauls),
            Some(LogbookMessageValue::Pno(pno)) => {
                codes.port(&pno.port);
                codes.catches(&pno.catch_onboard);
            }
            Some(LogbookMessageValue::Lan(lan)) => {
                codes.port(&lan.port);
                codes.catches(&lan.catch_landed);
            }
            Some(LogbookMessageValue::Rtp(rtp)) => {
                codes.port(&rtp.port);
                codes.gears(&rtp.gear_onboard);
            }
            _ => {}
        }
    }
    codes
}

async fn resolve_names(reference_data: &dyn ReferenceDataRepository, codes: Codes) -> Names {
    let species = join_all(codes.species.into_iter().map(|code| async move {
        match reference_data.find_species(&code).await {
            Ok(found) => found.map(|s| (code, s.name)),
            Err(e) => {
                warn!(code = %code, error = %e, "Could not look up species");
                None
            }
        }
    }));
    let gears = join_all(codes.gears.into_iter().map(|code| async move {
        match reference_data.find_gear(&code).await {
            Ok(found) => found.map(|g| (code, g.name)),
            Err(e) => {
                warn!(code = %code, error = %e, "Could not look up gear");
                None
            }
        }
    }));
    let ports = join_all(codes.ports.into_iter().map(|code| async move {
        match reference_data.find_port(&code).await {
            Ok(found) => found.map(|p| (code, p.name)),
            Err(e) => {
                warn!(code = %code, error = %e, "Could not look up port");
                None
            }
        }
    }));

    let (species, gears, ports) = tokio::join!(species, gears, ports);
    Names {
        species: species.into_iter().flatten().collect(),
        gears: gears.into_iter().flatten().collect(),
        ports: ports.into_iter().flatten().collect(),
    }
}

/// Fill in the display names of every reference code in the payloads
pub async fn enrich_messages(reference_data: &dyn ReferenceDataRepository, messages: &mut [LogbookMessage]) {
    let names = resolve_names(reference_data, collect_codes(messages)).await;

    for message in messages.iter_mut() {
        match &mut message.message {
            Some(LogbookMessageValue::Dep(dep)) => {
                dep.departure_port_name = names.port(&dep.departure_port);
                names.gears(&mut dep.gear_onboard);
                names.catches(&mut dep.species_onboard);
            }
            Some(LogbookMessageValue::Far(far)) => {
                for haul in far.hauls.iter_mut() {
                    haul.gear_name = haul.gear.as_ref().and_then(|c| names.gears.get(c)).cloned();
                    names.catches(&mut haul.catches);
                }
            }
            Some(LogbookMessageValue::Coe(coe)) => {
                coe.target_species_name_on_entry = coe
                    .target_species_on_entry
                    .as_deref()
                    .and_then(target_species_name)
                    .map(str::to_string);
            }
            Some(LogbookMessageValue::Cox(cox)) => {
                cox.target_species_name_on_exit = cox
                    .target_species_on_exit
                    .as_deref()
                    .and_then(target_species_name)
                    .map(str::to_string);
            }
            Some(LogbookMessageValue::Pno(pno)) => {
                pno.port_name = names.port(&pno.port);
                names.catches(&mut pno.catch_onboard);
            }
            Some(LogbookMessageValue::Lan(lan)) => {
                lan.port_name = names.port(&lan.port);
                names.catches(&mut lan.catch_landed);
            }
            Some(LogbookMessageValue::Rtp(rtp)) => {
                rtp.port_name = names.port(&rtp.port);
                names.gears(&mut rtp.gear_onboard);
            }
            _ => {}
        }
    }
}
