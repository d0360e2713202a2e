//! Offline campus lookup used when the backend cannot be reached

/// Bot message shown after a failed exchange
pub const OFFLINE_MESSAGE: &str = "⚠️ **Connexion au Cerveau Impossible** \n\n \
Je n'arrive pas à joindre le serveur. \n\n \
Pour vous aider, je peux chercher votre campus Epitech le plus proche. \n\n \
**Quel est votre Code Postal ?**";

const NO_MATCH_MESSAGE: &str = "Je n'ai pas trouvé de correspondance exacte, mais Epitech est \
présent dans toute la France. Je vous invite à consulter la carte sur le site officiel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Campus {
    pub name: &'static str,
    pub zip: &'static str,
}

pub const CAMPUSES: &[Campus] = &[
    Campus { name: "Paris", zip: "94270" },
    Campus { name: "Bordeaux", zip: "33000" },
    Campus { name: "Lille", zip: "59000" },
    Campus { name: "Lyon", zip: "69000" },
    Campus { name: "Marseille", zip: "13000" },
    Campus { name: "Montpellier", zip: "34000" },
    Campus { name: "Nantes", zip: "44000" },
    Campus { name: "Nancy", zip: "54000" },
    Campus { name: "Nice", zip: "06000" },
    Campus { name: "Rennes", zip: "35000" },
    Campus { name: "Strasbourg", zip: "67000" },
    Campus { name: "Toulouse", zip: "31000" },
];

/// First campus whose department (two-digit prefix) starts the input
pub fn find_campus(input: &str) -> Option<&'static Campus> {
    let input = input.trim();
    CAMPUSES
        .iter()
        .find(|campus| input.starts_with(&campus.zip[..2]))
}

/// Bot reply for a postal code typed in offline mode
pub fn campus_reply(input: &str) -> String {
    match find_campus(input) {
        Some(campus) => format!(
            "Le campus **Epitech {}** semble être le plus proche ({}). \n\n \
             Vous pouvez les contacter directement pour plus d'informations sur le programme.",
            campus.name, campus.zip
        ),
        None => NO_MATCH_MESSAGE.to_string(),
    }
}
