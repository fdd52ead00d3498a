//! Shared fixture dataset for integration tests
//! A small slice of the Video_Games_Sales data with multi-platform titles,
//! a tie in 2015, a missing year and franchises with partial scores.
#![allow(dead_code)]

use game_sales_nlq::{AnswerEngine, AssistantConfig, GameRecord, GamesTable};
use std::sync::Arc;

pub struct Sales(pub f64, pub f64, pub f64, pub f64, pub f64);

pub fn game(
    name: &str,
    platform: &str,
    year: Option<i64>,
    genre: &str,
    publisher: &str,
    sales: Sales,
    critic: Option<(f64, i64)>,
    user: Option<(f64, i64)>,
) -> GameRecord {
    let mut record = GameRecord::new(name, platform, year);
    record.genre = Some(genre.to_string());
    record.publisher = Some(publisher.to_string());
    record.na_sales = Some(sales.0);
    record.eu_sales = Some(sales.1);
    record.jp_sales = Some(sales.2);
    record.other_sales = Some(sales.3);
    record.global_sales = Some(sales.4);
    record.critic_score = critic.map(|c| c.0);
    record.critic_count = critic.map(|c| c.1);
    record.user_score = user.map(|u| u.0);
    record.user_count = user.map(|u| u.1);
    record
}

pub fn records() -> Vec<GameRecord> {
    vec![
        game("Wii Sports", "Wii", Some(2006), "Sports", "Nintendo",
            Sales(41.36, 28.96, 3.77, 8.45, 82.53), Some((76.0, 51)), Some((8.0, 322))),
        game("Super Mario Bros.", "NES", Some(1985), "Platform", "Nintendo",
            Sales(29.08, 3.58, 6.81, 0.77, 40.24), None, None),
        game("Mario Kart Wii", "Wii", Some(2008), "Racing", "Nintendo",
            Sales(15.68, 12.76, 3.79, 3.29, 35.52), Some((82.0, 73)), Some((8.3, 709))),
        game("Tetris", "GB", Some(1989), "Puzzle", "Nintendo",
            Sales(23.2, 2.26, 4.22, 0.58, 30.26), None, None),
        game("Grand Theft Auto V", "PS3", Some(2013), "Action", "Take-Two Interactive",
            Sales(7.02, 9.09, 0.98, 3.96, 21.04), Some((97.0, 50)), Some((8.2, 3994))),
        game("Grand Theft Auto V", "X360", Some(2013), "Action", "Take-Two Interactive",
            Sales(9.66, 5.14, 0.06, 1.41, 16.27), Some((97.0, 58)), Some((8.1, 3711))),
        game("Grand Theft Auto V", "PS4", Some(2014), "Action", "Take-Two Interactive",
            Sales(3.96, 6.31, 0.38, 1.97, 12.61), Some((97.0, 66)), Some((8.3, 2899))),
        game("Kinect Adventures!", "X360", Some(2010), "Misc", "Microsoft Game Studios",
            Sales(15.0, 4.89, 0.24, 1.69, 21.82), Some((61.0, 45)), Some((6.3, 106))),
        game("Pokemon Black/White", "DS", Some(2010), "Role-Playing", "Nintendo",
            Sales(5.51, 3.17, 5.65, 0.8, 15.14), None, None),
        game("Call of Duty: Black Ops", "X360", Some(2010), "Shooter", "Activision",
            Sales(9.7, 3.68, 0.11, 1.13, 14.62), Some((87.0, 89)), Some((6.3, 1454))),
        game("Call of Duty: Black Ops", "PS3", Some(2010), "Shooter", "Activision",
            Sales(5.99, 4.37, 0.48, 1.79, 12.63), Some((88.0, 58)), Some((6.4, 1094))),
        game("The Legend of Zelda: Ocarina of Time", "N64", Some(1998), "Action", "Nintendo",
            Sales(4.1, 1.89, 1.45, 0.16, 7.6), Some((99.0, 22)), Some((9.1, 2400))),
        game("The Legend of Zelda: Twilight Princess", "Wii", Some(2006), "Action", "Nintendo",
            Sales(3.83, 2.19, 0.6, 0.7, 7.31), Some((95.0, 88)), Some((9.0, 2023))),
        game("The Legend of Zelda: Phantom Hourglass", "DS", Some(2007), "Action", "Nintendo",
            Sales(1.84, 1.87, 0.71, 0.34, 4.76), Some((90.0, 70)), None),
        game("Zelda II: The Adventure of Link", "NES", Some(1987), "Adventure", "Nintendo",
            Sales(2.19, 0.5, 1.61, 0.08, 4.38), None, None),
        game("Alpha Racer", "PS4", Some(2015), "Racing", "Indie Works",
            Sales(0.5, 0.3, 0.1, 0.1, 1.0), None, None),
        game("beta racer", "PS4", Some(2015), "Racing", "Indie Works",
            Sales(0.5, 0.3, 0.1, 0.1, 1.0), None, None),
        game("Lost Cartridge", "PC", None, "Misc", "Unknown",
            Sales(0.2, 0.2, 0.0, 0.1, 0.5), None, None),
    ]
}

pub fn table() -> Arc<GamesTable> {
    Arc::new(GamesTable::from_records(&records()))
}

/// Warmed engine over the fixture with the default configuration
pub fn engine() -> AnswerEngine {
    engine_with(AssistantConfig::default())
}

pub fn engine_with(config: AssistantConfig) -> AnswerEngine {
    let engine = AnswerEngine::new(table(), config);
    engine.warm();
    engine
}

pub const CSV_HEADER: &str = "Name,Platform,Year_of_Release,Genre,Publisher,NA_Sales,EU_Sales,JP_Sales,Other_Sales,Global_Sales,Critic_Score,Critic_Count,User_Score,User_Count,Developer,Rating";
