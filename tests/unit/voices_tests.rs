/*!
 * Tests for voice catalogs and lookup
 */

use dubsync::app_config::SpeechProvider;
use dubsync::voices::VoiceCatalog;

/// Test catalog contents
#[test]
fn test_catalogs_shouldExposeProviderVoices() {
    let gemini = VoiceCatalog::for_provider(SpeechProvider::Gemini);
    let elevenlabs = VoiceCatalog::for_provider(SpeechProvider::ElevenLabs);

    assert_eq!(gemini.voices().len(), 30);
    assert_eq!(elevenlabs.voices().len(), 19);
    assert!(gemini.voices().iter().all(|v| v.id == v.name));
    assert!(elevenlabs.voices().iter().all(|v| v.id != v.name));
}

/// Test lookup by description
#[test]
fn test_by_characteristic_withExactDescription_shouldFindVoice() {
    let catalog = VoiceCatalog::for_provider(SpeechProvider::Gemini);
    assert_eq!(catalog.by_characteristic("Gravelly, Lower pitch, Male").name, "Algenib");
}

/// Test that a distant query still resolves to some voice
#[test]
fn test_by_name_withUnrelatedQuery_shouldStillReturnAVoice() {
    let catalog = VoiceCatalog::for_provider(SpeechProvider::ElevenLabs);
    let voice = catalog.by_name("zzzzzzzzzzzzzzzzzzzz");
    assert!(catalog.voices().contains(&voice));
}

/// Test resolution order: index, name, description
#[test]
fn test_resolve_shouldPreferNameOverDescription() {
    let catalog = VoiceCatalog::for_provider(SpeechProvider::ElevenLabs);
    assert_eq!(catalog.resolve("0").name, "Aria");
    assert_eq!(catalog.resolve("brian").name, "Brian");
    assert_eq!(catalog.resolve("Conversational and laid back").name, "Will");
}
