//! Fixed keyword sets for the intent classifier.
//!
//! All terms are folded (lower-case, no accents) and matched as whole words.
//! Portuguese comes first in each list, English after it.

use crate::query::plan::LookupField;

/// Unrelated-domain terms; any hit makes the question out of scope
pub const OUT_OF_SCOPE: &[&str] = &[
    "banana", "preco", "precos", "clima", "restaurante", "uber", "bitcoin", "dolar", "imposto", "impostos",
    "vacina", "cotacao", "criptomoeda", "bolsa de valores", "horoscopo", "temperatura",
    "transito", "eleicao", "politica", "voo", "hotel", "price", "prices", "weather", "restaurant", "dollar",
    "tax", "taxes", "vaccine", "stock market", "stocks", "crypto", "recipe", "horoscope", "temperature",
    "traffic", "election", "politics", "flight",
];

/// Lookup phrases after which the title fragment follows
pub const LOOKUP_LEADS: &[(&str, LookupField)] = &[
    ("qual o ano", LookupField::ReleaseYear),
    ("qual ano", LookupField::ReleaseYear),
    ("que ano", LookupField::ReleaseYear),
    ("em que ano", LookupField::ReleaseYear),
    ("em qual ano", LookupField::ReleaseYear),
    ("ano de lancamento", LookupField::ReleaseYear),
    ("data de lancamento", LookupField::ReleaseYear),
    ("lancamento", LookupField::ReleaseYear),
    ("quando saiu", LookupField::ReleaseYear),
    ("quando lancou", LookupField::ReleaseYear),
    ("quando foi lancado", LookupField::ReleaseYear),
    ("quando foi lancada", LookupField::ReleaseYear),
    ("foi lancado", LookupField::ReleaseYear),
    ("foi lancada", LookupField::ReleaseYear),
    ("what year", LookupField::ReleaseYear),
    ("which year", LookupField::ReleaseYear),
    ("release year", LookupField::ReleaseYear),
    ("release date", LookupField::ReleaseYear),
    ("when did", LookupField::ReleaseYear),
    ("when was", LookupField::ReleaseYear),
    ("quais plataformas", LookupField::Platforms),
    ("que plataformas", LookupField::Platforms),
    ("plataformas de", LookupField::Platforms),
    ("plataformas do", LookupField::Platforms),
    ("plataformas da", LookupField::Platforms),
    ("which platforms", LookupField::Platforms),
    ("what platforms", LookupField::Platforms),
    ("platforms of", LookupField::Platforms),
    ("platforms for", LookupField::Platforms),
    ("quem publicou", LookupField::Publisher),
    ("publicadora de", LookupField::Publisher),
    ("publicadora do", LookupField::Publisher),
    ("publicadora da", LookupField::Publisher),
    ("who published", LookupField::Publisher),
    ("publisher of", LookupField::Publisher),
    ("quem desenvolveu", LookupField::Developer),
    ("desenvolvedora de", LookupField::Developer),
    ("desenvolvedora do", LookupField::Developer),
    ("desenvolvedora da", LookupField::Developer),
    ("who developed", LookupField::Developer),
    ("who made", LookupField::Developer),
    ("developer of", LookupField::Developer),
    ("qual o genero", LookupField::Genre),
    ("qual genero", LookupField::Genre),
    ("genero de", LookupField::Genre),
    ("genero do", LookupField::Genre),
    ("genero da", LookupField::Genre),
    ("what genre", LookupField::Genre),
    ("genre of", LookupField::Genre),
    ("quanto vendeu", LookupField::Sales),
    ("quantas copias", LookupField::Sales),
    ("how much did", LookupField::Sales),
    ("how many copies", LookupField::Sales),
    ("how many units", LookupField::Sales),
];

/// Words stripped from the front of a captured title fragment
pub const FRAGMENT_LEADING_NOISE: &[&str] = &[
    "de", "do", "da", "dos", "das", "o", "a", "os", "as", "of", "jogo", "game", "for", "para", "was", "is",
    "did", "does", "em", "in", "foi", "saiu", "lancado", "lancada", "lancamento", "ano",
];

/// Words stripped from the end of a captured title fragment
pub const FRAGMENT_TRAILING_NOISE: &[&str] = &[
    "released", "release", "come", "came", "out", "saiu", "lancado", "lancada", "sell", "sold", "vendeu",
    "published", "developed", "launched", "em", "in", "que", "qual", "ano", "year", "what", "foi", "was",
    "de", "do", "da", "of", "on", "jogo", "game",
];

pub const AVERAGE_WORDS: &[&str] = &[
    "media", "medias", "nota", "notas", "avaliacao", "avaliacoes", "average", "mean", "rating", "ratings",
];

pub const FRANCHISE_WORDS: &[&str] = &["franquia", "serie", "saga", "franchise", "series"];

/// Known franchise tokens and the title fragment each one searches for
pub const KNOWN_FRANCHISES: &[(&str, &str)] = &[
    ("zelda", "zelda"),
    ("super mario", "super mario"),
    ("mario kart", "mario kart"),
    ("mario", "mario"),
    ("pokemon", "pokemon"),
    ("final fantasy", "final fantasy"),
    ("ff", "final fantasy"),
    ("call of duty", "call of duty"),
    ("cod", "call of duty"),
    ("grand theft auto", "grand theft auto"),
    ("gta", "grand theft auto"),
    ("need for speed", "need for speed"),
    ("nfs", "need for speed"),
    ("mortal kombat", "mortal kombat"),
    ("resident evil", "resident evil"),
    ("fifa", "fifa"),
    ("halo", "halo"),
    ("sonic", "sonic"),
    ("assassins creed", "assassin creed"),
    ("the sims", "the sims"),
    ("sims", "sims"),
    ("metal gear", "metal gear"),
    ("street fighter", "street fighter"),
    ("tomb raider", "tomb raider"),
    ("battlefield", "battlefield"),
    ("madden", "madden"),
    ("kirby", "kirby"),
    ("donkey kong", "donkey kong"),
    ("crash bandicoot", "crash bandicoot"),
    ("spyro", "spyro"),
    ("tekken", "tekken"),
    ("gran turismo", "gran turismo"),
    ("god of war", "god of war"),
    ("uncharted", "uncharted"),
    ("gears of war", "gears of war"),
    ("guitar hero", "guitar hero"),
    ("just dance", "just dance"),
    ("dragon quest", "dragon quest"),
    ("kingdom hearts", "kingdom hearts"),
    ("metroid", "metroid"),
    ("fire emblem", "fire emblem"),
    ("animal crossing", "animal crossing"),
    ("smash bros", "smash bros"),
    ("star wars", "star wars"),
    ("far cry", "far cry"),
    ("fallout", "fallout"),
    ("elder scrolls", "elder scrolls"),
    ("red dead", "red dead"),
    ("mega man", "mega man"),
    ("castlevania", "castlevania"),
    ("lego", "lego"),
];

/// Words that end a franchise name captured after "franquia"/"franchise"
pub const FRANCHISE_STOPWORDS: &[&str] = &[
    "de", "da", "do", "das", "dos", "em", "no", "na", "nos", "nas", "por", "para", "com", "e", "ou", "the",
    "in", "on", "by", "with", "for", "and", "or", "of", "a", "o", "os", "as", "games", "jogos", "jogo",
    "game", "franchise", "franquia", "serie", "series", "saga", "nota", "media", "average", "rating",
    "critica", "usuarios", "usuario", "critic", "user", "users", "score", "qual", "what", "is", "e",
];

/// Explicit ranking vocabulary; its presence always routes to ranking
pub const RANKING_WORDS: &[&str] = &[
    "top", "ranking", "rank", "mais vendidos", "mais vendidas", "mais bem avaliados", "mais bem avaliadas",
    "melhores", "maiores", "best selling", "best sellers", "most sold", "best rated", "top rated",
    "highest rated", "best",
];

pub const SALES_WORDS: &[&str] = &[
    "vendas", "venda", "vendidos", "vendidas", "vendeu", "venderam", "sales", "sold", "selling", "sell",
];

pub const TOTAL_WORDS: &[&str] = &["total", "totais", "soma", "somam", "somadas", "somados", "combined", "sum"];

pub const COUNT_WORDS: &[&str] = &["quantos", "quantas", "how many", "numero de", "number of", "count"];

pub const SUMMARY_WORDS: &[&str] = &[
    "resumo", "panorama", "estatisticas", "visao geral", "summary", "overview", "statistics",
];

/// Generic score words that select a score metric for averages
pub const SCORE_WORDS: &[&str] = &["nota", "notas", "score", "scores", "rating", "ratings", "avaliacao"];

pub const REGION_JP: &[&str] = &["japao", "japan", "japanese", "japones", "japonesas", "jp", "jap"];
pub const REGION_EU: &[&str] = &["europa", "europe", "european", "europeu", "europeias", "eu sales"];
pub const REGION_NA: &[&str] = &[
    "america do norte", "north america", "north american", "norte americano", "norte americanas", "eua",
    "usa", "estados unidos", "united states", "na sales",
];
pub const REGION_OTHER: &[&str] = &[
    "outras regioes", "other regions", "resto do mundo", "rest of the world", "other sales", "outros mercados",
];

pub const COMBO_WORDS: &[&str] = &["combo", "combinado", "combinada", "ponderado", "ponderada", "blended", "combined score"];
pub const CRITIC_WORDS: &[&str] = &[
    "critica", "critico", "criticos", "critic", "critics", "metacritic", "bem avaliados", "bem avaliadas",
    "best rated", "top rated", "highest rated",
];
pub const USER_WORDS: &[&str] = &["usuario", "usuarios", "user", "users", "userscore", "jogadores", "players"];

/// Platform spellings and the dataset code they map to; longer phrases first
pub const PLATFORMS: &[(&str, &str)] = &[
    ("wii u", "WiiU"),
    ("wiiu", "WiiU"),
    ("xbox 360", "X360"),
    ("x360", "X360"),
    ("xbox one", "XOne"),
    ("xone", "XOne"),
    ("xbox", "XB"),
    ("xb", "XB"),
    ("playstation 4", "PS4"),
    ("ps4", "PS4"),
    ("playstation 3", "PS3"),
    ("ps3", "PS3"),
    ("playstation 2", "PS2"),
    ("ps2", "PS2"),
    ("playstation vita", "PSV"),
    ("ps vita", "PSV"),
    ("psv", "PSV"),
    ("psp", "PSP"),
    ("ps1", "PS"),
    ("playstation", "PS"),
    ("3ds", "3DS"),
    ("nintendo ds", "DS"),
    ("ds", "DS"),
    ("game boy advance", "GBA"),
    ("gba", "GBA"),
    ("game boy", "GB"),
    ("gameboy", "GB"),
    ("gb", "GB"),
    ("super nintendo", "SNES"),
    ("snes", "SNES"),
    ("nes", "NES"),
    ("nintendo 64", "N64"),
    ("n64", "N64"),
    ("gamecube", "GC"),
    ("gc", "GC"),
    ("wii", "Wii"),
    ("pc", "PC"),
    ("atari 2600", "2600"),
    ("2600", "2600"),
    ("sega saturn", "SAT"),
    ("saturn", "SAT"),
    ("dreamcast", "DC"),
    ("mega drive", "GEN"),
    ("genesis", "GEN"),
];

pub const GENRES: &[(&str, &str)] = &[
    ("acao", "Action"),
    ("action", "Action"),
    ("esporte", "Sports"),
    ("esportes", "Sports"),
    ("sports", "Sports"),
    ("corrida", "Racing"),
    ("racing", "Racing"),
    ("tiro", "Shooter"),
    ("shooter", "Shooter"),
    ("fps", "Shooter"),
    ("rpg", "Role-Playing"),
    ("role playing", "Role-Playing"),
    ("puzzle", "Puzzle"),
    ("aventura", "Adventure"),
    ("adventure", "Adventure"),
    ("simulacao", "Simulation"),
    ("simulation", "Simulation"),
    ("luta", "Fighting"),
    ("fighting", "Fighting"),
    ("estrategia", "Strategy"),
    ("strategy", "Strategy"),
    ("platformer", "Platform"),
];

pub const PUBLISHERS: &[(&str, &str)] = &[
    ("electronic arts", "Electronic Arts"),
    ("ea", "Electronic Arts"),
    ("activision", "Activision"),
    ("ubisoft", "Ubisoft"),
    ("take two", "Take-Two Interactive"),
    ("rockstar", "Rockstar Games"),
    ("sony", "Sony Computer Entertainment"),
    ("microsoft", "Microsoft Game Studios"),
    ("thq", "THQ"),
    ("konami", "Konami Digital Entertainment"),
    ("sega", "Sega"),
    ("capcom", "Capcom"),
    ("square enix", "Square Enix"),
    ("bandai namco", "Namco Bandai Games"),
    ("namco", "Namco Bandai Games"),
    ("bethesda", "Bethesda Softworks"),
    ("nintendo", "Nintendo"),
];

/// Marker words for language detection
pub const PT_MARKERS: &[&str] = &[
    "qual", "quais", "quanto", "quantos", "quantas", "jogo", "jogos", "vendas", "franquia", "media", "nota",
    "ano", "mais", "vendidos", "em", "de", "do", "da", "no", "na", "os", "lancamento", "quando", "saiu",
    "usuarios", "critica", "plataformas", "melhores", "por", "um", "uma", "japao", "europa",
];
pub const EN_MARKERS: &[&str] = &[
    "what", "which", "the", "games", "game", "sales", "franchise", "average", "score", "year", "best",
    "selling", "in", "of", "by", "how", "many", "when", "released", "most", "rated", "user", "critic",
    "platforms", "did", "was", "come", "out", "japan", "europe",
];
