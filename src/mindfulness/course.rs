use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::journal::repo::user_key;
use crate::storage::{load_json, save_json, StorageClient};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub content: &'static str,
    pub video: &'static str,
}

pub const SECTIONS: [Section; 5] = [
    Section {
        title: "What is Mindfulness?",
        content: "### Understanding Mindfulness\n\
            Mindfulness is being fully present in the moment, noticing thoughts, \
            emotions and sensations without judging them.\n\n\
            **Benefits:** sharper focus, less stress and anxiety, steadier emotions, better sleep.\n\n\
            **Exercise: 5 Senses Grounding**\n\
            - Name 5 things you can see\n\
            - Name 4 things you can hear\n\
            - Name 3 things you can feel\n\
            - Name 2 things you can smell\n\
            - Name 1 thing you can taste\n\n\
            _Use this whenever you feel overwhelmed or distracted._",
        video: "https://www.youtube.com/watch?v=7-1Y6IbAxdM",
    },
    Section {
        title: "Breathing Techniques",
        content: "### The Power of Breath\n\
            Slow, deep breathing moves the body into a relaxed state.\n\n\
            **Box Breathing (4-4-4-4)**\n\
            - Inhale through the nose for 4 seconds\n\
            - Hold for 4 seconds\n\
            - Exhale through the mouth for 4 seconds\n\
            - Hold for 4 seconds, then repeat 5 to 10 times\n\n\
            **Belly Breathing**\n\
            - One hand on the chest, one on the stomach\n\
            - Breathe in so the belly rises while the chest stays still\n\
            - Breathe out fully and feel the belly fall\n\
            - Continue for 5 minutes\n\n\
            _Try it before bed or in stressful moments._",
        video: "https://www.youtube.com/watch?v=g2wo2Impnfg",
    },
    Section {
        title: "Guided Meditation",
        content: "### Guided Meditation\n\
            A structured practice where spoken instructions guide your attention.\n\n\
            **Simple 5-Minute Meditation**\n\
            - Sit comfortably somewhere quiet\n\
            - Close your eyes and follow your breath\n\
            - Scan your body from head to toe for tension\n\
            - When the mind wanders, return gently to the breath\n\n\
            **Apps with guided sessions:** Headspace, Calm, Insight Timer.\n\n\
            _A morning session sets a calm tone for the day._",
        video: "https://www.youtube.com/watch?v=sG7DBA-mgFY",
    },
    Section {
        title: "Mindful Thinking",
        content: "### Thinking Mindfully\n\
            The aim is not to stop thoughts but to watch them without attachment.\n\n\
            - Observe thoughts like passing clouds\n\
            - Write down 3 things you are grateful for each day\n\
            - Give daily activities your full attention\n\
            - Answer self-criticism with self-compassion\n\n\
            **Reflection**\n\
            - What am I feeling right now?\n\
            - What are my thoughts, without judgment?\n\
            - What can I let go of?\n\n\
            _Write your answers in your journal._",
        video: "https://www.youtube.com/watch?v=JkB7hJan0Q0",
    },
    Section {
        title: "Applying Mindfulness",
        content: "### Mindfulness in Daily Life\n\
            Mindfulness applies to everything you do, not only meditation.\n\n\
            - **Eating:** slow down and notice flavours and textures\n\
            - **Walking:** feel each step and take in your surroundings\n\
            - **Listening:** give the speaker your full attention\n\n\
            **10-Minute Challenge**\n\
            Spend 10 minutes fully immersed in one task, then ask yourself how it felt.\n\n\
            _It is not about doing something extra, only about being present in what you already do._",
        video: "https://www.youtube.com/watch?v=iGjY41vZAU8",
    },
];

pub const TOTAL_STEPS: u8 = SECTIONS.len() as u8;

pub const COMPLETION_MESSAGE: &str =
    "Congratulations! You have completed the Mindfulness Course!";

/// Number of completed sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgress {
    step: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseAction {
    Complete,
    Back,
    Reset,
}

impl CourseProgress {
    pub fn at(step: u8) -> Self {
        Self {
            step: step.min(TOTAL_STEPS),
        }
    }

    #[cfg(test)]
    pub fn step(self) -> u8 {
        self.step
    }

    pub fn apply(self, action: CourseAction) -> Self {
        match action {
            CourseAction::Complete => Self::at(self.step.saturating_add(1)),
            CourseAction::Back => Self::at(self.step.saturating_sub(1)),
            CourseAction::Reset => Self::default(),
        }
    }

    pub fn fraction(self) -> f64 {
        f64::from(self.step) / f64::from(TOTAL_STEPS)
    }

    pub fn is_complete(self) -> bool {
        self.step >= TOTAL_STEPS
    }

    pub fn current(self) -> Option<&'static Section> {
        SECTIONS.get(usize::from(self.step))
    }
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    pub number: u8,
    #[serde(flatten)]
    pub section: Section,
}

#[derive(Debug, Serialize)]
pub struct CourseView {
    pub step: u8,
    pub total: u8,
    pub fraction: f64,
    pub completed: bool,
    pub section: Option<SectionView>,
    pub message: Option<&'static str>,
}

impl From<CourseProgress> for CourseView {
    fn from(p: CourseProgress) -> Self {
        Self {
            step: p.step,
            total: TOTAL_STEPS,
            fraction: p.fraction(),
            completed: p.is_complete(),
            section: p.current().map(|s| SectionView {
                number: p.step + 1,
                section: *s,
            }),
            message: p.is_complete().then_some(COMPLETION_MESSAGE),
        }
    }
}

pub struct CourseStore {
    storage: Arc<dyn StorageClient>,
    lock: Mutex<()>,
}

impl CourseStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    pub async fn load(&self, user_id: Uuid) -> CourseProgress {
        let stored: CourseProgress =
            load_json(self.storage.as_ref(), &user_key(user_id, "course.json")).await;
        CourseProgress::at(stored.step)
    }

    pub async fn apply(&self, user_id: Uuid, action: CourseAction) -> AppResult<CourseProgress> {
        let _guard = self.lock.lock().await;
        let next = self.load(user_id).await.apply(action);
        save_json(self.storage.as_ref(), &user_key(user_id, "course.json"), &next).await?;
        Ok(next)
    }
}
