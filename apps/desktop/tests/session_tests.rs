use desktop::generate::{GenerateError, StoryBackend};
use desktop::narrator::ThinkingNarrator;
use desktop::session::{SessionState, StorySession};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use story::{GenerationRequest, Platform, Scene, ViralStory, VisualPrompt};

struct ScriptedCall {
    delay: Duration,
    result: Result<ViralStory, GenerateError>,
}

/// Stands in for the HTTP client: answers from a fixed script and counts
/// invocations.
struct ScriptedBackend {
    calls: AtomicUsize,
    script: Mutex<VecDeque<ScriptedCall>>,
}

impl ScriptedBackend {
    fn new(script: Vec<ScriptedCall>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StoryBackend for ScriptedBackend {
    fn generate(&self, _request: &GenerationRequest) -> Result<ViralStory, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let call = self.script.lock().unwrap().pop_front().unwrap_or(ScriptedCall {
            delay: Duration::ZERO,
            result: Err(GenerateError::Transport("script exhausted".to_string())),
        });
        if !call.delay.is_zero() {
            thread::sleep(call.delay);
        }
        call.result
    }
}

fn ok(story: ViralStory) -> ScriptedCall {
    ScriptedCall {
        delay: Duration::ZERO,
        result: Ok(story),
    }
}

fn ok_after(delay: Duration, story: ViralStory) -> ScriptedCall {
    ScriptedCall {
        delay,
        result: Ok(story),
    }
}

fn err(error: GenerateError) -> ScriptedCall {
    ScriptedCall {
        delay: Duration::ZERO,
        result: Err(error),
    }
}

fn scene(id: u32, text: &str, duration: u32) -> Scene {
    Scene {
        id,
        text_content: text.to_string(),
        visual_prompts: VisualPrompt {
            description: format!("visual for scene {id}"),
            camera_angle: "Medium shot".to_string(),
            mood: "Tense".to_string(),
        },
        estimated_duration: duration,
    }
}

fn sample_story(title: &str) -> ViralStory {
    ViralStory {
        title: title.to_string(),
        topic: "a lost dog finds its way home".to_string(),
        target_audience: "everyone".to_string(),
        scenes: vec![
            scene(1, "opening", 5),
            scene(2, "middle", 7),
            scene(3, "reveal", 4),
        ],
        clickbait_score: 87,
        thinking_trace: "reasoning".to_string(),
    }
}

fn new_session() -> StorySession {
    StorySession::new(ThinkingNarrator::default())
}

fn wait_for(
    session: &mut StorySession,
    timeout: Duration,
    pred: impl Fn(&SessionState) -> bool,
) {
    let deadline = Instant::now() + timeout;
    loop {
        session.poll(Instant::now());
        if pred(session.state()) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "session stuck in {:?}",
            session.state()
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn submit_enters_loading_before_any_backend_effect() {
    let backend = ScriptedBackend::new(vec![ok_after(
        Duration::from_millis(200),
        sample_story("slow"),
    )]);
    let mut session = new_session();

    let accepted = session.submit(
        "a lost dog finds its way home",
        Platform::TikTok,
        backend.clone(),
        Instant::now(),
    );
    assert!(accepted);
    assert!(matches!(session.state(), SessionState::Loading));

    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });
    assert_eq!(backend.calls(), 1);
}

#[test]
fn blank_topic_stays_idle_and_never_calls_the_backend() {
    let backend = ScriptedBackend::new(vec![ok(sample_story("unused"))]);
    let mut session = new_session();

    for topic in ["", "   ", "\t\n  "] {
        let accepted = session.submit(topic, Platform::TikTok, backend.clone(), Instant::now());
        assert!(!accepted);
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.validation_message().is_some());
    }

    thread::sleep(Duration::from_millis(50));
    session.poll(Instant::now());
    assert!(matches!(session.state(), SessionState::Idle));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn success_holds_scenes_in_order() {
    let backend = ScriptedBackend::new(vec![ok(sample_story("happy path"))]);
    let mut session = new_session();
    session.submit(
        "a lost dog finds its way home",
        Platform::TikTok,
        backend,
        Instant::now(),
    );
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });

    let SessionState::Success(story) = session.state() else {
        unreachable!();
    };
    assert_eq!(story.clickbait_score, 87);
    assert_eq!(
        story.scenes.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    // Narration schedule is torn down on leaving Loading.
    assert!(!session.narration_pending());
}

#[test]
fn http_failure_surfaces_and_a_new_submit_recovers() {
    let backend = ScriptedBackend::new(vec![
        err(GenerateError::HttpStatus(
            "500 Internal Server Error".to_string(),
        )),
        ok(sample_story("second try")),
    ]);
    let mut session = new_session();

    session.submit("topic one", Platform::YoutubeShorts, backend.clone(), Instant::now());
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Error(_))
    });
    let SessionState::Error(message) = session.state() else {
        unreachable!();
    };
    assert!(!message.is_empty());
    assert!(message.contains("500"));

    let accepted = session.submit("topic two", Platform::YoutubeShorts, backend, Instant::now());
    assert!(accepted);
    assert!(matches!(session.state(), SessionState::Loading));
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });
}

#[test]
fn editing_one_scene_leaves_the_rest_untouched() {
    let backend = ScriptedBackend::new(vec![ok(sample_story("editable"))]);
    let mut session = new_session();
    session.submit("topic", Platform::InstagramReels, backend, Instant::now());
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });

    let before = match session.state() {
        SessionState::Success(story) => story.clone(),
        _ => unreachable!(),
    };
    session.edit_scene_text(2, "rewritten middle");
    let SessionState::Success(after) = session.state() else {
        unreachable!();
    };
    assert_eq!(after.scenes[1].text_content, "rewritten middle");
    assert_eq!(after.scenes[1].visual_prompts, before.scenes[1].visual_prompts);
    assert_eq!(
        after.scenes[1].estimated_duration,
        before.scenes[1].estimated_duration
    );
    assert_eq!(after.scenes[0], before.scenes[0]);
    assert_eq!(after.scenes[2], before.scenes[2]);
    assert_eq!(after.title, before.title);
}

#[test]
fn stale_completion_never_overwrites_a_newer_submit() {
    let backend = ScriptedBackend::new(vec![
        ok_after(Duration::from_millis(300), sample_story("superseded")),
        ok(sample_story("current")),
    ]);
    let mut session = new_session();

    session.submit("first topic", Platform::TikTok, backend.clone(), Instant::now());
    thread::sleep(Duration::from_millis(50));
    // Resubmitting while Loading supersedes the in-flight call.
    session.submit("second topic", Platform::TikTok, backend, Instant::now());

    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });
    let title = match session.state() {
        SessionState::Success(story) => story.title.clone(),
        _ => unreachable!(),
    };
    assert_eq!(title, "current");

    // Let the superseded call finish, then confirm it was discarded.
    thread::sleep(Duration::from_millis(400));
    session.poll(Instant::now());
    let SessionState::Success(story) = session.state() else {
        panic!("stale completion replaced the session state");
    };
    assert_eq!(story.title, "current");
}

#[test]
fn narrated_lines_accumulate_and_reset_per_submit() {
    let narrator = ThinkingNarrator::new(
        vec!["one".to_string(), "two".to_string(), "three".to_string()],
        Duration::from_millis(10),
    );
    let backend = ScriptedBackend::new(vec![
        ok_after(Duration::from_millis(120), sample_story("first")),
        ok_after(Duration::from_millis(50), sample_story("second")),
    ]);
    let mut session = StorySession::new(narrator);

    session.submit("topic", Platform::TikTok, backend.clone(), Instant::now());
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });
    // All three lines were due well before the backend answered, and they
    // stay visible after Loading ends.
    assert_eq!(session.narrated_lines(), &["one", "two", "three"]);

    session.submit("topic again", Platform::TikTok, backend, Instant::now());
    assert!(session.narrated_lines().is_empty());
    wait_for(&mut session, Duration::from_secs(2), |s| {
        matches!(s, SessionState::Success(_))
    });
}
