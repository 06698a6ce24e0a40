//! Dungeons & Dragons scenario with a storyteller, a protagonist and a
//! commentator.
//!
//! The scenario first asks the model to describe each character and to
//! expand the quest into an opening line, then seats the three agents in a
//! [`DialogueSimulator`] that speaks in the order storyteller, protagonist,
//! commentator.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::dialogue::{DialogueAgent, DialogueSimulator, round_robin};
use crate::error::ChainError;
use crate::model::{ChatModel, Message, system_message, user_message};

/// Setting shared by every character.
const WORLD_DESCRIPTION: &str = "Действие происходит во вселенной Гарри Поттера, куда проник герой русских народных сказок, Кощей Бессмертный.";

/// Names, quest and word limit for one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DndScenario {
    /// Main player.
    pub protagonist: String,
    /// Narrator who drives the plot.
    pub storyteller: String,
    /// Joker who comments without taking part.
    pub commentator: String,
    /// The task the protagonist pursues.
    pub quest: String,
    /// Word budget for descriptions and lines.
    pub word_limit: usize,
}

impl Default for DndScenario {
    fn default() -> Self {
        Self {
            protagonist: "Гарри Поттер".to_string(),
            storyteller: "Старый маг".to_string(),
            commentator: "Призрак-шутник".to_string(),
            quest: "Найти все 50 крестражей Кощея Бессмертного".to_string(),
            word_limit: 50,
        }
    }
}

/// Character descriptions generated during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDescriptions {
    /// Storyteller description.
    pub storyteller: String,
    /// Protagonist description.
    pub protagonist: String,
    /// Commentator description.
    pub commentator: String,
}

/// Everything [`DndScenario::setup`] produces.
#[derive(Debug)]
pub struct RoleplaySetup {
    /// Generated character descriptions.
    pub descriptions: CharacterDescriptions,
    /// Opening line spoken by the storyteller.
    pub opening: String,
    /// Simulator with the opening already injected.
    pub simulator: DialogueSimulator,
}

impl DndScenario {
    /// The game rules every prompt starts with.
    pub fn game_description(&self) -> String {
        format!(
            "Мы будем играть в Dungeons & Dragons. Задание: {quest}.
Главный игрок - {protagonist}.
Второй игрок - {commentator} комментирует происходящее шутками, но не участвует в сюжете.
Ведущий - расказчик, {storyteller}.",
            quest = self.quest,
            protagonist = self.protagonist,
            commentator = self.commentator,
            storyteller = self.storyteller,
        )
    }

    /// Prompt asking for a short description of `name`, who plays `role`.
    ///
    /// `role` is the genitive form used in the request, e.g. `рассказчика`.
    pub fn character_prompt(&self, role: &str, name: &str) -> Vec<Message> {
        vec![
            system_message(WORLD_DESCRIPTION),
            user_message(&format!(
                "{game}
Пожалуйста предложи креативное описание {role} по имени {name}, уложись в {limit} слов или меньше.
Говори напрямую с {name}.
Больше ничего не добавляй.",
                game = self.game_description(),
                limit = self.word_limit,
            )),
        ]
    }

    /// Prompt that expands the quest into the storyteller's opening line.
    pub fn opening_prompt(&self) -> Vec<Message> {
        vec![
            system_message(&format!(
                "Напиши стартовую реплику для истории от имени {}, который обращается к {}",
                self.storyteller, self.protagonist
            )),
            user_message(&format!(
                "{game}

Ты - рассказчик, {storyteller}.
Пожалуйста, напиши вводную фразу для начала истории. Будь изобретатен и креативен.
Пожалуйста, уложись в {limit} слов или меньше
Обращайся непосредственно к персонажу {protagonist}.
Больше ничего не добавляй",
                game = self.game_description(),
                storyteller = self.storyteller,
                protagonist = self.protagonist,
                limit = self.word_limit,
            )),
        ]
    }

    /// System message for the protagonist.
    pub fn protagonist_system_message(&self, description: &str) -> Message {
        system_message(&format!(
            "{game}
Никогда не забывай, что ты главный игрок - {me}, а я - рассказчик, {other}.
Вот описание твоего персонажа: {description}.
Ты предлагаешь действия, которые планируешь предпринять, и я объясню, что произойдет, когда ты предпримешь эти действия.
Говори в первом лице от имени персонажа {me}.
Для описания движений собственного тела заключите описание в «*».
Не меняй роли!
Не говори с точки зрения персонажа {other}.
Больше ничего не добавляй.
Запомни, что ты главный герой - {me}.
Прекращай говорить, когда тебе кажется, что ты закончил мысль.
Отвечай коротко, одной строкой, уложись в {limit} слов или меньше.
Не отвечай одно и то же! Развивай историю, совершай новые действия. Читателю должно быть интересно. Придумывай новые трудности для персонажа {me} и поменьше разговаривай с ним.
",
            game = self.game_description(),
            me = self.protagonist,
            other = self.storyteller,
            limit = self.word_limit,
        ))
    }

    /// System message for the storyteller.
    pub fn storyteller_system_message(&self, description: &str) -> Message {
        system_message(&format!(
            "{game}
Никогда не забывай, что ты рассказчик - {me}, а я главный герой - {other}.
Вот описание твоего персонажа: {description}.
Ты предлагаешь действия, которые планируешь предпринять, и я объясню, что произойдет, когда ты предпримешь эти действия.
Говори в первом лице от имени персонажа {me}.
Для описания движений собственного тела заключите описание в «*».
Не меняй роли!
Не говори с точки зрения персонажа {other}.
Больше ничего не добавляй.
Запомни, что ты рассказчик - {me}.
Прекращай говорить, когда тебе кажется, что ты закончил мысль.
Отвечай коротко, одной строкой, уложись в {limit} слов или меньше.
Не отвечай одно и то же! Развивай историю, совершай новые активные действия. Меньше говори и больше действуй, чтобы сюжет развивался. Читателю должно быть интересно.
",
            game = self.game_description(),
            me = self.storyteller,
            other = self.protagonist,
            limit = self.word_limit,
        ))
    }

    /// System message for the commentator. Lines are capped at five words.
    pub fn commentator_system_message(&self, description: &str) -> Message {
        system_message(&format!(
            "{game}
Ты - {me}.
Вот описание твоего персонажа - {description}
Напиши очень короткий комментарий или шутку про происходящее. Пиши строго не более 5 слов.
Пиши строго пять слов или меньше! И ничего больше не пиши!
",
            game = self.game_description(),
            me = self.commentator,
        ))
    }

    /// Generates descriptions and the opening line, then seats the agents.
    ///
    /// Makes four model calls: storyteller, protagonist and commentator
    /// descriptions, then the opening line. The opening is injected into the
    /// simulator on behalf of the storyteller, so the protagonist speaks first.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidConfig`] for a zero word limit or a blank
    /// name, or the first model error.
    pub async fn setup(&self, model: Arc<dyn ChatModel>) -> Result<RoleplaySetup, ChainError> {
        self.validate()?;

        let storyteller = model
            .complete(&self.character_prompt("рассказчика", &self.storyteller), None)
            .await?;
        let protagonist = model
            .complete(&self.character_prompt("главного героя", &self.protagonist), None)
            .await?;
        let commentator = model
            .complete(&self.character_prompt("комментатора", &self.commentator), None)
            .await?;
        let opening = model.complete(&self.opening_prompt(), None).await?;
        debug!(opening = %opening, "generated opening line");

        let agents = vec![
            DialogueAgent::new(
                self.storyteller.clone(),
                self.storyteller_system_message(&storyteller),
                Arc::clone(&model),
            ),
            DialogueAgent::new(
                self.protagonist.clone(),
                self.protagonist_system_message(&protagonist),
                Arc::clone(&model),
            ),
            DialogueAgent::new(
                self.commentator.clone(),
                self.commentator_system_message(&commentator),
                model,
            ),
        ];
        let mut simulator = DialogueSimulator::new(agents, round_robin)?;
        simulator.reset();
        simulator.inject(&self.storyteller, &opening);

        Ok(RoleplaySetup {
            descriptions: CharacterDescriptions {
                storyteller,
                protagonist,
                commentator,
            },
            opening,
            simulator,
        })
    }

    fn validate(&self) -> Result<(), ChainError> {
        if self.word_limit == 0 {
            return Err(ChainError::InvalidConfig {
                message: "word limit must be positive".to_string(),
            });
        }
        for (field, value) in [
            ("protagonist", &self.protagonist),
            ("storyteller", &self.storyteller),
            ("commentator", &self.commentator),
            ("quest", &self.quest),
        ] {
            if value.trim().is_empty() {
                return Err(ChainError::InvalidConfig {
                    message: format!("{field} must not be blank"),
                });
            }
        }
        Ok(())
    }
}
